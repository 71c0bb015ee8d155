/// Upload intents, identifier policy and image probing
use crate::asset::view;
use crate::config::FieldConfig;
use crate::error::{AssetError, AssetResult};
use crate::form::{FileDescriptor, OwnerFields};
use image::ImageReader;
use std::io::Cursor;

/// Image types accepted for upload
pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/bmp",
    "image/tiff",
];

/// How the public id of a new upload is chosen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentifierPolicy {
    /// Value of another field on the owning record
    OwnerField(String),
    /// Original filename without its extension
    Filename,
    /// Unique name generated for the upload
    Generated,
}

impl IdentifierPolicy {
    /// Policies configured for a field, highest precedence first
    pub fn for_field(field: &FieldConfig) -> Vec<IdentifierPolicy> {
        let mut policies = Vec::with_capacity(3);
        if let Some(name) = &field.public_id_field {
            policies.push(IdentifierPolicy::OwnerField(name.clone()));
        }
        if field.filename_as_public_id {
            policies.push(IdentifierPolicy::Filename);
        }
        policies.push(IdentifierPolicy::Generated);
        policies
    }

    fn resolve(&self, file: &FileDescriptor, owner: &dyn OwnerFields) -> Option<String> {
        let id = match self {
            IdentifierPolicy::OwnerField(name) => owner.field_value(name)?,
            IdentifierPolicy::Filename => file.stem().to_string(),
            IdentifierPolicy::Generated => uuid::Uuid::new_v4().simple().to_string(),
        };
        Some(id).filter(|id| !id.is_empty())
    }
}

/// Public id for a new upload: first policy that yields a value, then the prefix
pub fn derive_public_id(
    field: &FieldConfig,
    file: &FileDescriptor,
    owner: &dyn OwnerFields,
) -> String {
    let id = IdentifierPolicy::for_field(field)
        .iter()
        .find_map(|policy| policy.resolve(file, owner))
        .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());

    match view::prefix(field) {
        Some(prefix) => format!("{}_{}", prefix, id),
        None => id,
    }
}

/// Reject files outside the allow-list
pub fn validate_mime_type(file: &FileDescriptor) -> AssetResult<()> {
    if ALLOWED_MIME_TYPES.contains(&file.mime_type.as_str()) {
        Ok(())
    } else {
        Err(AssetError::UnsupportedMediaType {
            mime_type: file.mime_type.clone(),
            filename: file.original_filename.clone(),
        })
    }
}

/// One pending upload
#[derive(Debug, Clone)]
pub struct UploadIntent {
    pub file: FileDescriptor,
    pub public_id: String,
}

impl UploadIntent {
    pub fn new(field: &FieldConfig, file: FileDescriptor, owner: &dyn OwnerFields) -> Self {
        let public_id = derive_public_id(field, &file, owner);
        Self { file, public_id }
    }
}

/// Result of probing uploaded bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageProbe {
    pub width: u32,
    pub height: u32,
    /// Detected format name (e.g. "png")
    pub format: String,
}

/// Read dimensions and format from the image header, without decoding pixels
pub fn probe_dimensions(data: &[u8]) -> Result<ImageProbe, String> {
    let mut reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| e.to_string())?;
    let format = reader
        .format()
        .ok_or_else(|| "Unrecognized image format".to_string())?;
    reader.no_limits();
    let (width, height) = reader.into_dimensions().map_err(|e| e.to_string())?;

    Ok(ImageProbe {
        width,
        height,
        format: format
            .extensions_str()
            .first()
            .copied()
            .unwrap_or_default()
            .to_string(),
    })
}

#[cfg(test)]
pub(crate) fn png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::new(width, height);
    let mut buf = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn file(name: &str) -> FileDescriptor {
        FileDescriptor::from_bytes(name, "image/png", vec![1, 2, 3])
    }

    fn owner(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_owner_field_takes_precedence() {
        let field = FieldConfig {
            public_id_field: Some("slug".to_string()),
            filename_as_public_id: true,
            ..FieldConfig::new("cover")
        };
        let id = derive_public_id(&field, &file("beach.png"), &owner(&[("slug", "summer")]));
        assert_eq!(id, "summer");
    }

    #[test]
    fn test_empty_owner_field_falls_through() {
        let field = FieldConfig {
            public_id_field: Some("slug".to_string()),
            filename_as_public_id: true,
            ..FieldConfig::new("cover")
        };
        let id = derive_public_id(&field, &file("beach.png"), &owner(&[("slug", "")]));
        assert_eq!(id, "beach");
    }

    #[test]
    fn test_filename_policy() {
        let field = FieldConfig {
            filename_as_public_id: true,
            ..FieldConfig::new("cover")
        };
        assert_eq!(derive_public_id(&field, &file("a.b.png"), &owner(&[])), "a.b");
        assert_eq!(derive_public_id(&field, &file("noext"), &owner(&[])), "noext");
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let field = FieldConfig::new("cover");
        let a = derive_public_id(&field, &file("a.png"), &owner(&[]));
        let b = derive_public_id(&field, &file("a.png"), &owner(&[]));
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
    }

    #[test]
    fn test_prefix_applies_to_every_policy() {
        let field = FieldConfig {
            prefix: Some("blog".to_string()),
            filename_as_public_id: true,
            ..FieldConfig::new("cover")
        };
        assert_eq!(derive_public_id(&field, &file("beach.png"), &owner(&[])), "blog_beach");

        let field = FieldConfig {
            prefix: Some("blog".to_string()),
            public_id_field: Some("slug".to_string()),
            ..FieldConfig::new("cover")
        };
        assert_eq!(
            derive_public_id(&field, &file("beach.png"), &owner(&[("slug", "post")])),
            "blog_post"
        );

        let field = FieldConfig {
            prefix: Some("blog".to_string()),
            ..FieldConfig::new("cover")
        };
        assert!(derive_public_id(&field, &file("beach.png"), &owner(&[])).starts_with("blog_"));
    }

    #[test]
    fn test_mime_allow_list() {
        assert!(validate_mime_type(&file("a.png")).is_ok());

        let text = FileDescriptor::from_bytes("notes.txt", "text/plain", vec![1]);
        assert!(matches!(
            validate_mime_type(&text),
            Err(AssetError::UnsupportedMediaType { .. })
        ));
    }

    #[test]
    fn test_probe_png() {
        let probe = probe_dimensions(&png(12, 7)).unwrap();
        assert_eq!(probe.width, 12);
        assert_eq!(probe.height, 7);
        assert_eq!(probe.format, "png");
    }

    fn crc32(bytes: &[u8]) -> u32 {
        let mut crc = 0xffff_ffffu32;
        for &byte in bytes {
            crc ^= byte as u32;
            for _ in 0..8 {
                let mask = (crc & 1).wrapping_neg();
                crc = (crc >> 1) ^ (0xedb8_8320 & mask);
            }
        }
        !crc
    }

    fn chunk(out: &mut Vec<u8>, kind: &[u8; 4], data: &[u8]) {
        out.extend_from_slice(&(data.len() as u32).to_be_bytes());
        let start = out.len();
        out.extend_from_slice(kind);
        out.extend_from_slice(data);
        let crc = crc32(&out[start..]);
        out.extend_from_slice(&crc.to_be_bytes());
    }

    /// PNG whose header claims a size far beyond what a full decode may allocate
    fn oversized_png(width: u32, height: u32) -> Vec<u8> {
        let mut out = b"\x89PNG\r\n\x1a\n".to_vec();
        let mut ihdr = Vec::new();
        ihdr.extend_from_slice(&width.to_be_bytes());
        ihdr.extend_from_slice(&height.to_be_bytes());
        ihdr.extend_from_slice(&[8, 2, 0, 0, 0]);
        chunk(&mut out, b"IHDR", &ihdr);
        chunk(&mut out, b"IDAT", &[0x78, 0x9c, 0x03, 0x00, 0x00, 0x00, 0x00, 0x01]);
        chunk(&mut out, b"IEND", &[]);
        out
    }

    #[test]
    fn test_probe_reads_header_only() {
        let probe = probe_dimensions(&oversized_png(16000, 16000)).unwrap();
        assert_eq!((probe.width, probe.height), (16000, 16000));
        assert_eq!(probe.format, "png");
    }

    #[test]
    fn test_probe_garbage_fails() {
        assert!(probe_dimensions(b"definitely not an image").is_err());
    }
}
