use anyhow::Result;
use image::{imageops::FilterType, RgbImage};
use ndarray::{s, Array4, ArrayViewD, Axis, Ix2, IxDyn};
use ort::session::Session;
use ort::value::Value;
use std::fs;

use crate::domain::detection::Detection;
use crate::domain::model::DetectorParams;
use crate::domain::postprocess::{decode_predictions, non_max_suppression};

/// Sesión ONNX del detector de vehículos. La inferencia en sí es una caja
/// negra: aquí se prepara el tensor de entrada y la salida cruda se entrega
/// al post-procesado del dominio.
pub struct OnnxVehicleDetector {
    session: Session,
}

impl OnnxVehicleDetector {
    pub fn load(path: &str) -> Result<Self> {
        // El nodo objetivo es una placa sin GPU: proveedor CPU por defecto.
        let builder = Session::builder()?.with_intra_threads(4)?;
        let model_bytes = fs::read(path)?;
        let session = builder.commit_from_memory(&model_bytes)?;
        Ok(Self { session })
    }

    /// Pasada completa: entrada NCHW normalizada → salida cruda → ganancia
    /// de puntuación → decodificación → supresión de no-máximos. Devuelve
    /// las cajas en píxeles de la imagen original.
    pub fn detect(
        &mut self,
        rgb: &RgbImage,
        params: &DetectorParams,
        class_names: &[String],
    ) -> Result<Vec<Detection>> {
        let imgsz = params.input_size as usize;
        let resized = image::imageops::resize(rgb, imgsz as u32, imgsz as u32, FilterType::Nearest);

        let mut input = Array4::<f32>::zeros((1, 3, imgsz, imgsz));
        for (x, y, pixel) in resized.enumerate_pixels() {
            input[[0, 0, y as usize, x as usize]] = pixel[0] as f32 / 255.0;
            input[[0, 1, y as usize, x as usize]] = pixel[1] as f32 / 255.0;
            input[[0, 2, y as usize, x as usize]] = pixel[2] as f32 / 255.0;
        }

        let input_shape = vec![1i64, 3, imgsz as i64, imgsz as i64];
        let input_tensor = Value::from_array((input_shape, input.into_raw_vec_and_offset().0))?;

        let outputs = self.session.run(ort::inputs![input_tensor])?;
        let (out_shape, out_data) = outputs[0].try_extract_tensor::<f32>()?;

        let dims: Vec<usize> = out_shape.into_iter().map(|&d| d as usize).collect();
        let raw = ArrayViewD::from_shape(IxDyn(&dims), out_data)?;

        // Salida [1][5 + clases][n]: se descarta el lote, se aplica la
        // ganancia sobre las filas de puntuación y se transpone a filas de
        // predicción para el decodificador.
        let mut preds = raw
            .index_axis(Axis(0), 0)
            .to_owned()
            .into_dimensionality::<Ix2>()?;
        if params.score_gain != 1.0 {
            preds
                .slice_mut(s![4.., ..])
                .mapv_inplace(|v| v * params.score_gain);
        }

        let decoded = decode_predictions(
            preds.t(),
            params.conf_threshold,
            rgb.width() as f32,
            rgb.height() as f32,
            class_names,
        );
        Ok(non_max_suppression(decoded, params.iou_threshold))
    }
}
