pub mod annotate;
pub mod encode;

pub use annotate::FrameAnnotator;
pub use encode::{decode_image, encode_jpeg, to_base64};
