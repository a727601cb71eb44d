pub mod pipeline;
pub mod yolo_engine;
