use std::{fmt::Display, path::Path};

use bytes::Bytes;
use faststr::FastStr;
use mime::Mime;

use crate::error::Result;

/// One named section of a `multipart/form-data` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormPart {
    name: FastStr,
    data: Bytes,
    filename: Option<FastStr>,
    content_type: Option<FastStr>,
}

impl FormPart {
    /// A plain field with neither filename nor content type.
    pub fn new(name: impl AsRef<str>, data: impl Into<Bytes>) -> Self {
        Self {
            name: FastStr::new(name),
            data: data.into(),
            filename: None,
            content_type: None,
        }
    }

    /// A file field; the content type defaults to `application/octet-stream`.
    pub fn file(name: impl AsRef<str>, data: impl Into<Bytes>, filename: impl AsRef<str>) -> Self {
        Self {
            name: FastStr::new(name),
            data: data.into(),
            filename: Some(FastStr::new(filename)),
            content_type: Some(FastStr::new(mime::APPLICATION_OCTET_STREAM.as_ref())),
        }
    }

    pub fn with_content_type(mut self, content_type: &str) -> Result<Self> {
        let mime: Mime = content_type
            .parse()
            .map_err(|err| invalid_request!("invalid content type `{content_type}`: {err}"))?;
        self.content_type = Some(FastStr::new(mime.as_ref()));
        Ok(self)
    }

    pub fn with_filename(mut self, filename: impl AsRef<str>) -> Self {
        if self.content_type.is_none() {
            self.content_type = Some(FastStr::new(mime::APPLICATION_OCTET_STREAM.as_ref()));
        }
        self.filename = Some(FastStr::new(filename));
        self
    }

    /// Reads `path` into a file part, guessing the content type from its extension.
    pub async fn from_path(name: impl AsRef<str>, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path)
            .await
            .map_err(|err| invalid_request!("read {}: {err}", path.display()))?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .ok_or_else(|| invalid_request!("{} has no file name", path.display()))?;

        let mtype = mime_guess::from_path(path).first_or_octet_stream();
        Ok(Self {
            name: FastStr::new(name),
            data: Bytes::from(data),
            filename: Some(FastStr::new(filename)),
            content_type: Some(FastStr::new(mtype.as_ref())),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }
}

impl Display for FormPart {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "name: {}, data_len: {}, filename: {}, content_type: {}",
            self.name,
            self.data.len(),
            self.filename.as_deref().unwrap_or("-"),
            self.content_type.as_deref().unwrap_or("-"),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use crate::{error::ErrorKind, form::FormPart};

    #[test]
    pub fn test_content_type_defaults() {
        let part = FormPart::new("data", "{}");
        assert_eq!(part.filename(), None);
        assert_eq!(part.content_type(), None);

        let part = FormPart::file("files.assets", vec![0xff, 0xd8], "piramids.jpg");
        assert_eq!(part.filename(), Some("piramids.jpg"));
        assert_eq!(part.content_type(), Some("application/octet-stream"));

        let part = part.with_content_type("image/jpeg").unwrap();
        assert_eq!(part.content_type(), Some("image/jpeg"));

        let part = FormPart::new("blob", "x").with_filename("x.bin");
        assert_eq!(part.content_type(), Some("application/octet-stream"));
    }

    #[test]
    pub fn test_invalid_content_type() {
        let err = FormPart::new("data", "{}")
            .with_content_type("not a mime")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }

    #[tokio::test]
    pub async fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("piramids.jpg");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(&[0xff, 0xd8, 0xff, 0xe0]).unwrap();

        let part = FormPart::from_path("files.assets", &path).await.unwrap();
        assert_eq!(part.name(), "files.assets");
        assert_eq!(part.filename(), Some("piramids.jpg"));
        assert_eq!(part.content_type(), Some("image/jpeg"));
        assert_eq!(part.data().as_ref(), &[0xff, 0xd8, 0xff, 0xe0]);

        let err = FormPart::from_path("missing", dir.path().join("missing.bin"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }
}
