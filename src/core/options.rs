//! Export configuration.
//!
//! [`ExportOptions`] is the whole configuration surface the engine reads. A
//! driver builds it with the `with_*` setters or loads it from JSON; every
//! field has a default so partial option files are fine.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::util::{Error, Result};

/// Numeric compression policy for the binary encoding.
///
/// Text encodings always behave as [`CompressionMethod::Strings`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionMethod {
    /// Decimal text for every value.
    Strings,
    /// Fixed-width binary primitives; integer arrays may still use delta+deflate.
    FastestParsing,
    /// Per array, the smallest exact encoding.
    #[default]
    SmallestNonlossy,
    /// Quantized floats bounded by `quantize_param`; delta+deflate integers.
    SmallestLossy,
}

impl CompressionMethod {
    /// CLI name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Strings => "strings",
            Self::FastestParsing => "fastest",
            Self::SmallestNonlossy => "smallest",
            Self::SmallestLossy => "lossy",
        }
    }
}

impl FromStr for CompressionMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "strings" | "string" => Ok(Self::Strings),
            "fastest" | "fastest_parsing" => Ok(Self::FastestParsing),
            "smallest" | "smallest_nonlossy" | "nonlossy" => Ok(Self::SmallestNonlossy),
            "lossy" | "smallest_lossy" => Ok(Self::SmallestLossy),
            other => Err(Error::other(format!("unknown compression method: {other}"))),
        }
    }
}

impl fmt::Display for CompressionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Output encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    /// Binary infoset (`.x3db`).
    Binary,
    /// XML markup (`.x3d`).
    Xml,
    /// Brace-delimited classic text (`.x3dv`, or `.wrl` for VRML97).
    Classic,
}

impl Encoding {
    /// Human-readable name used in errors.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Binary => "binary",
            Self::Xml => "XML",
            Self::Classic => "classic",
        }
    }

    /// File extension (without dot) for documents of this encoding and version.
    pub fn extension(self, version: SpecVersion) -> &'static str {
        match self {
            Self::Binary => "x3db",
            Self::Xml => "x3d",
            Self::Classic if version.is_vrml97() => "wrl",
            Self::Classic => "x3dv",
        }
    }

    /// Guess the encoding from a file name.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "x3db" => Some(Self::Binary),
            "x3d" | "xml" => Some(Self::Xml),
            "x3dv" | "wrl" => Some(Self::Classic),
            _ => None,
        }
    }

    /// Does a preamble exist for `version` in this encoding?
    pub fn check_version(self, version: SpecVersion) -> Result<()> {
        let supported = match (self, version.major, version.minor) {
            (Self::Classic, 2, 0) => true,
            (_, 3, 0..=3) | (_, 4, 0) => true,
            _ => false,
        };
        if supported {
            Ok(())
        } else {
            Err(Error::UnsupportedSpecVersion {
                major: version.major,
                minor: version.minor,
                encoding: self.name(),
            })
        }
    }
}

impl FromStr for Encoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "binary" | "x3db" | "fi" => Ok(Self::Binary),
            "xml" | "x3d" => Ok(Self::Xml),
            "classic" | "x3dv" | "vrml" | "wrl" => Ok(Self::Classic),
            other => Err(Error::other(format!("unknown encoding: {other}"))),
        }
    }
}

/// Specification version written into the document preamble.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpecVersion {
    pub major: u32,
    pub minor: u32,
}

impl SpecVersion {
    pub const VRML97: Self = Self::new(2, 0);
    pub const X3D_3_0: Self = Self::new(3, 0);
    pub const X3D_3_1: Self = Self::new(3, 1);
    pub const X3D_3_2: Self = Self::new(3, 2);
    pub const X3D_3_3: Self = Self::new(3, 3);
    pub const X3D_4_0: Self = Self::new(4, 0);

    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// VRML 2.0 output has no profile, component, IMPORT or EXPORT statements.
    pub const fn is_vrml97(self) -> bool {
        self.major == 2
    }

    /// Parse `"3.2"` style strings.
    pub fn parse(s: &str) -> Result<Self> {
        let (major, minor) = s
            .trim()
            .split_once('.')
            .ok_or_else(|| Error::other(format!("bad version string: {s}")))?;
        let major = major
            .parse()
            .map_err(|_| Error::other(format!("bad major version: {s}")))?;
        let minor = minor
            .parse()
            .map_err(|_| Error::other(format!("bad minor version: {s}")))?;
        Ok(Self { major, minor })
    }
}

impl Default for SpecVersion {
    fn default() -> Self {
        Self::X3D_3_2
    }
}

impl fmt::Display for SpecVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Configuration consumed by the exporter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Numeric compression policy (binary encoding only).
    pub compression: CompressionMethod,
    /// Maximum absolute error for quantized floats.
    pub quantize_param: f32,
    /// Round text numbers to this many significant digits.
    pub significant_digits: Option<u32>,
    /// Byte-minimal XML (no newlines or indentation).
    pub strip_whitespace: bool,
    /// Emit `<!DOCTYPE ...>` in XML output.
    pub print_doctype: bool,
    /// Emit `<?xml ...?>` in XML output.
    pub print_xml_declaration: bool,
    /// Float arrays shorter than this are never compressed under
    /// [`CompressionMethod::SmallestNonlossy`].
    pub min_float_array_size_to_compress: usize,
    /// Omit fields equal to their default.
    pub remove_defaults: bool,
    /// Target version.
    pub version: SpecVersion,
    /// Prefix stripped from URL fields.
    pub base_url: Option<String>,
    /// Rewrite `.wrl` references to the target encoding's extension.
    pub upgrade_legacy_urls: bool,
    /// zlib level for compressed payloads.
    pub deflate_level: u32,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            compression: CompressionMethod::SmallestNonlossy,
            quantize_param: 0.001,
            significant_digits: None,
            strip_whitespace: false,
            print_doctype: true,
            print_xml_declaration: true,
            min_float_array_size_to_compress: 7,
            remove_defaults: true,
            version: SpecVersion::default(),
            base_url: None,
            upgrade_legacy_urls: false,
            deflate_level: 9,
        }
    }
}

impl ExportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load options from a JSON document; missing keys keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_compression(mut self, method: CompressionMethod) -> Self {
        self.compression = method;
        self
    }

    pub fn with_quantize_param(mut self, max_error: f32) -> Self {
        self.quantize_param = max_error;
        self
    }

    pub fn with_significant_digits(mut self, digits: Option<u32>) -> Self {
        self.significant_digits = digits;
        self
    }

    pub fn with_strip_whitespace(mut self, strip: bool) -> Self {
        self.strip_whitespace = strip;
        self
    }

    pub fn with_doctype(mut self, print: bool) -> Self {
        self.print_doctype = print;
        self
    }

    pub fn with_xml_declaration(mut self, print: bool) -> Self {
        self.print_xml_declaration = print;
        self
    }

    pub fn with_min_float_array_size_to_compress(mut self, len: usize) -> Self {
        self.min_float_array_size_to_compress = len;
        self
    }

    pub fn with_remove_defaults(mut self, remove: bool) -> Self {
        self.remove_defaults = remove;
        self
    }

    pub fn with_version(mut self, version: SpecVersion) -> Self {
        self.version = version;
        self
    }

    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        self.base_url = Some(base.into());
        self
    }

    pub fn with_upgrade_legacy_urls(mut self, upgrade: bool) -> Self {
        self.upgrade_legacy_urls = upgrade;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let o = ExportOptions::default();
        assert_eq!(o.compression, CompressionMethod::SmallestNonlossy);
        assert_eq!(o.min_float_array_size_to_compress, 7);
        assert!((o.quantize_param - 0.001).abs() < 1e-9);
        assert!(o.remove_defaults);
    }

    #[test]
    fn test_partial_json() {
        let o = ExportOptions::from_json(r#"{"compression":"smallest_lossy","quantize_param":0.01}"#)
            .unwrap();
        assert_eq!(o.compression, CompressionMethod::SmallestLossy);
        assert!(o.print_doctype);
        assert_eq!(o.version, SpecVersion::X3D_3_2);
    }

    #[test]
    fn test_version_checks() {
        assert!(Encoding::Classic.check_version(SpecVersion::VRML97).is_ok());
        assert!(matches!(
            Encoding::Xml.check_version(SpecVersion::VRML97),
            Err(Error::UnsupportedSpecVersion { major: 2, minor: 0, .. })
        ));
        assert!(Encoding::Binary.check_version(SpecVersion::new(3, 7)).is_err());
        assert!(Encoding::Binary.check_version(SpecVersion::X3D_4_0).is_ok());
        assert_eq!(SpecVersion::parse("3.3").unwrap(), SpecVersion::X3D_3_3);
        assert!(SpecVersion::parse("three").is_err());
    }

    #[test]
    fn test_encoding_from_path() {
        assert_eq!(Encoding::from_path("a/b.x3db"), Some(Encoding::Binary));
        assert_eq!(Encoding::from_path("scene.WRL"), Some(Encoding::Classic));
        assert_eq!(Encoding::from_path("scene.obj"), None);
        assert_eq!("lossy".parse::<CompressionMethod>().unwrap(), CompressionMethod::SmallestLossy);
        assert_eq!(Encoding::Classic.extension(SpecVersion::VRML97), "wrl");
    }
}
