pub mod bus;
pub mod gpio;
pub mod http;
pub mod onnx;
pub mod v4l2;
