use bytes::{BufMut, Bytes, BytesMut};
use rand::Rng;

use crate::form::FormPart;

const BOUNDARY_PREFIX: &str = "------------------------";
const CRLF: &[u8] = b"\r\n";

/// Default slice size handed to the transport while streaming a body.
pub const DEFAULT_CHUNK_SIZE: usize = 16 * 1024;

/// A fully encoded `multipart/form-data` body.
#[derive(Debug, Clone)]
pub struct MultipartBody {
    boundary: String,
    bytes: Bytes,
}

impl MultipartBody {
    /// Encodes `parts` in order under a fresh boundary absent from every part's data.
    pub fn encode(parts: &[FormPart]) -> Self {
        let boundary = loop {
            let candidate = gen_boundary();
            if !parts
                .iter()
                .any(|part| contains(part.data(), candidate.as_bytes()))
            {
                break candidate;
            }
        };
        Self::encode_with_boundary(parts, boundary)
    }

    pub(crate) fn encode_with_boundary(parts: &[FormPart], boundary: String) -> Self {
        let capacity = parts
            .iter()
            .map(|part| part.data().len() + 128 + boundary.len())
            .sum::<usize>()
            + boundary.len()
            + 8;
        let mut buf = BytesMut::with_capacity(capacity);

        for part in parts {
            buf.put_slice(b"--");
            buf.put_slice(boundary.as_bytes());
            buf.put_slice(CRLF);

            buf.put_slice(b"Content-Disposition: form-data; name=\"");
            buf.put_slice(escape_quoted(part.name()).as_bytes());
            buf.put_u8(b'"');
            if let Some(filename) = part.filename() {
                buf.put_slice(b"; filename=\"");
                buf.put_slice(escape_quoted(filename).as_bytes());
                buf.put_u8(b'"');
            }
            buf.put_slice(CRLF);

            if let Some(content_type) = part.content_type() {
                buf.put_slice(b"Content-Type: ");
                buf.put_slice(content_type.as_bytes());
                buf.put_slice(CRLF);
            }
            buf.put_slice(CRLF);

            buf.put_slice(part.data());
            buf.put_slice(CRLF);
        }

        buf.put_slice(b"--");
        buf.put_slice(boundary.as_bytes());
        buf.put_slice(b"--");
        buf.put_slice(CRLF);

        Self {
            boundary,
            bytes: buf.freeze(),
        }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Value for the request's `Content-Type` header.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Zero-copy slices of at most `chunk_size` bytes, in body order.
    pub fn chunks(&self, chunk_size: usize) -> Chunks {
        Chunks {
            bytes: self.bytes.clone(),
            chunk_size: chunk_size.max(1),
        }
    }
}

pub struct Chunks {
    bytes: Bytes,
    chunk_size: usize,
}

impl Iterator for Chunks {
    type Item = Bytes;

    fn next(&mut self) -> Option<Self::Item> {
        if self.bytes.is_empty() {
            return None;
        }
        let at = self.chunk_size.min(self.bytes.len());
        Some(self.bytes.split_to(at))
    }
}

fn gen_boundary() -> String {
    let mut rng = rand::thread_rng();
    let suffix: u128 = rng.r#gen();
    format!("{BOUNDARY_PREFIX}{suffix:032x}")
}

// RFC 7578 §4.2: quotes and line breaks in quoted parameters are percent-encoded.
fn escape_quoted(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.len() <= haystack.len() && haystack.windows(needle.len()).any(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use bytes::Bytes;
    use futures::stream::once;
    use multer::Multipart;

    use crate::{
        form::FormPart,
        multipart::{MultipartBody, contains, escape_quoted},
    };

    async fn decode(body: &MultipartBody) -> Vec<(String, Option<String>, Option<String>, Bytes)> {
        let bytes = body.bytes().clone();
        let stream = once(async move { Ok::<Bytes, Infallible>(bytes) });
        let mut mpart = Multipart::new(stream, body.boundary());

        let mut fields = vec![];
        while let Some(field) = mpart.next_field().await.unwrap() {
            let name = field.name().unwrap_or_default().to_string();
            let filename = field.file_name().map(|s| s.to_string());
            let content_type = field.content_type().map(|m| m.to_string());
            let data = field.bytes().await.unwrap();
            fields.push((name, filename, content_type, data));
        }
        fields
    }

    fn article_parts() -> Vec<FormPart> {
        let jpeg: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();
        vec![
            FormPart::new(
                "data",
                r#"{"title":"Sample article", "body":" Created from iOS app"}"#,
            ),
            FormPart::file("files.assets", jpeg, "piramids.jpg")
                .with_content_type("image/jpeg")
                .unwrap(),
        ]
    }

    #[tokio::test]
    pub async fn test_decode_preserves_parts() {
        let parts = article_parts();
        let body = MultipartBody::encode(&parts);
        let fields = decode(&body).await;

        assert_eq!(fields.len(), parts.len());
        for (part, (name, filename, content_type, data)) in parts.iter().zip(fields) {
            assert_eq!(part.name(), name);
            assert_eq!(part.filename(), filename.as_deref());
            assert_eq!(part.content_type(), content_type.as_deref());
            assert_eq!(part.data(), &data);
        }
    }

    #[tokio::test]
    pub async fn test_empty_and_binary_parts() {
        let parts = vec![
            FormPart::new("empty", Bytes::new()),
            FormPart::file("crlf", b"\r\n--\r\n\r\n".to_vec(), "a.bin"),
            FormPart::new("third", "x"),
        ];
        let body = MultipartBody::encode(&parts);
        let fields = decode(&body).await;

        let names: Vec<_> = fields.iter().map(|f| f.0.as_str()).collect();
        assert_eq!(names, ["empty", "crlf", "third"]);
        assert!(fields[0].3.is_empty());
        assert_eq!(fields[1].3.as_ref(), b"\r\n--\r\n\r\n");
    }

    #[test]
    pub fn test_wire_layout() {
        let parts = vec![
            FormPart::new("data", "{}"),
            FormPart::file("file", "abc", "a.txt")
                .with_content_type("text/plain")
                .unwrap(),
        ];
        let body = MultipartBody::encode_with_boundary(&parts, "XyZ".to_string());
        let expected = "--XyZ\r\n\
            Content-Disposition: form-data; name=\"data\"\r\n\
            \r\n\
            {}\r\n\
            --XyZ\r\n\
            Content-Disposition: form-data; name=\"file\"; filename=\"a.txt\"\r\n\
            Content-Type: text/plain\r\n\
            \r\n\
            abc\r\n\
            --XyZ--\r\n";
        assert_eq!(body.bytes().as_ref(), expected.as_bytes());
        assert_eq!(body.len(), expected.len());
        assert_eq!(body.content_type(), "multipart/form-data; boundary=XyZ");
    }

    #[test]
    pub fn test_boundary_absent_from_data() {
        let parts = article_parts();
        for _ in 0..32 {
            let body = MultipartBody::encode(&parts);
            assert_eq!(body.boundary().len(), 56);
            for part in parts.iter() {
                assert!(!contains(part.data(), body.boundary().as_bytes()));
            }
        }
    }

    #[test]
    pub fn test_chunks_cover_body() {
        let body = MultipartBody::encode(&article_parts());
        let chunks: Vec<_> = body.chunks(1000).collect();
        assert!(chunks.iter().all(|c| c.len() <= 1000 && !c.is_empty()));
        let joined: Vec<u8> = chunks.iter().flat_map(|c| c.iter().copied()).collect();
        assert_eq!(joined.as_slice(), body.bytes().as_ref());
    }

    #[test]
    pub fn test_escape_quoted() {
        assert_eq!(escape_quoted("a\"b"), "a%22b");
        assert_eq!(escape_quoted("line\r\nbreak"), "line%0D%0Abreak");
        assert_eq!(escape_quoted("files.assets"), "files.assets");
    }
}
