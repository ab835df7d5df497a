use std::io::Read;

use tiny_http::Request;

use ferrite_gesture::{Frame, GestureError};

/// Reads the whole request body.
pub fn read_body(request: &mut Request) -> Result<Vec<u8>, GestureError> {
    let mut body = Vec::new();
    request.as_reader().read_to_end(&mut body)?;
    Ok(body)
}

/// Decodes PNG/JPEG/BMP/GIF bytes into an RGB frame. The extractor resizes,
/// so the frame keeps its native size.
pub fn decode_frame(bytes: &[u8]) -> Result<Frame, GestureError> {
    if bytes.is_empty() {
        return Err(GestureError::Camera("empty frame body".into()));
    }
    Ok(image::load_from_memory(bytes)?.to_rgb8())
}
