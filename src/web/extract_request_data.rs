use axum::{
    Json, body,
    extract::{FromRequest, Multipart, Request},
    http::header,
};
use base64::prelude::{BASE64_STANDARD, Engine as _};
use tracing::{debug, warn};

use super::{MAX_UPLOAD_SIZE_BYTES, error::ApiError, models::UploadBody};

/// Pulls the uploaded file out of a raw image body, a multipart `file` field,
/// or a JSON body carrying base64 `data`.
pub async fn extract_upload(request: Request) -> Result<(Vec<u8>, Option<String>), ApiError> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    if content_type.starts_with("multipart/form-data") {
        extract_multipart_file(request).await
    } else if content_type.starts_with("application/json") {
        extract_json_file(request).await
    } else {
        extract_direct_file(request, &content_type).await
    }
}

/// Decodes base64 text, tolerating a `data:<type>;base64,` prefix.
pub fn decode_base64_payload(text: &str) -> Result<Vec<u8>, ApiError> {
    let payload = match text.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => text,
    };
    BASE64_STANDARD
        .decode(payload.trim())
        .map_err(|e| ApiError::BadRequest(format!("Invalid base64 data: {}", e)))
}

async fn extract_multipart_file(request: Request) -> Result<(Vec<u8>, Option<String>), ApiError> {
    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to process multipart request: {}", e)))?;

    let mut file_data_opt: Option<Vec<u8>> = None;
    let mut content_type_opt: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to process multipart field: {}", e)))?
    {
        if field.name() != Some("file") {
            debug!("Ignoring multipart field: {}", field.name().unwrap_or("unnamed"));
            continue;
        }
        if file_data_opt.is_some() {
            warn!("Multiple 'file' fields found in multipart request, using the last one");
        }

        content_type_opt = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read file data: {}", e)))?;
        file_data_opt = Some(data.to_vec());
    }

    match file_data_opt {
        Some(data) if data.is_empty() => Err(ApiError::BadRequest(
            "Uploaded 'file' field is empty.".to_string(),
        )),
        Some(data) => Ok((data, content_type_opt)),
        None => Err(ApiError::BadRequest(
            "Missing 'file' field in multipart request.".to_string(),
        )),
    }
}

async fn extract_json_file(request: Request) -> Result<(Vec<u8>, Option<String>), ApiError> {
    let Json(upload) = Json::<UploadBody>::from_request(request, &())
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid JSON upload: {}", e)))?;

    let data = decode_base64_payload(&upload.data)?;
    if data.is_empty() {
        return Err(ApiError::BadRequest("Upload data is empty.".to_string()));
    }
    Ok((data, None))
}

async fn extract_direct_file(
    request: Request,
    content_type: &str,
) -> Result<(Vec<u8>, Option<String>), ApiError> {
    if !content_type.starts_with("image/") && !content_type.starts_with("application/octet-stream")
    {
        return Err(ApiError::UnsupportedMediaType(format!(
            "Content-Type '{}' is not supported. Expected image/*, multipart/form-data, application/json, or application/octet-stream.",
            content_type
        )));
    }

    let bytes = body::to_bytes(request.into_body(), MAX_UPLOAD_SIZE_BYTES)
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read request body: {}", e)))?;

    if bytes.is_empty() {
        return Err(ApiError::BadRequest("Request body is empty.".to_string()));
    }

    Ok((bytes.to_vec(), Some(content_type.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_base64_with_and_without_data_url() {
        assert_eq!(decode_base64_payload("aGk=").unwrap(), b"hi");
        assert_eq!(decode_base64_payload("data:image/png;base64,aGk=").unwrap(), b"hi");
        assert!(decode_base64_payload("!!!").is_err());
    }

    #[tokio::test]
    async fn test_direct_body_keeps_content_type() {
        let request = Request::builder()
            .header(header::CONTENT_TYPE, "image/png")
            .body(Body::from(vec![1u8, 2, 3]))
            .unwrap();
        let (data, content_type) = extract_upload(request).await.unwrap();
        assert_eq!(data, vec![1, 2, 3]);
        assert_eq!(content_type.as_deref(), Some("image/png"));
    }

    #[tokio::test]
    async fn test_json_body_is_base64_decoded() {
        let request = Request::builder()
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"data":"aGk="}"#))
            .unwrap();
        let (data, _) = extract_upload(request).await.unwrap();
        assert_eq!(data, b"hi");
    }

    #[tokio::test]
    async fn test_text_body_is_rejected() {
        let request = Request::builder()
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Body::from("hello"))
            .unwrap();
        assert!(matches!(
            extract_upload(request).await,
            Err(ApiError::UnsupportedMediaType(_))
        ));
    }

    #[tokio::test]
    async fn test_multipart_file_field() {
        let boundary = "XBOUNDARY";
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nignored\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"a.png\"\r\nContent-Type: image/png\r\n\r\nPNGDATA\r\n\
             --{b}--\r\n",
            b = boundary
        );
        let request = Request::builder()
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .unwrap();

        let (data, content_type) = extract_upload(request).await.unwrap();
        assert_eq!(data, b"PNGDATA");
        assert_eq!(content_type.as_deref(), Some("image/png"));
    }
}
