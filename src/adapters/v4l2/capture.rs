use anyhow::{anyhow, Result};
use image::{ImageFormat, RgbImage};
use v4l::format::FourCC;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;
use v4l::Device;

use crate::config::CameraConfig;

/// Frame capturado: RGB para el detector y JPEG listo para el visor.
pub struct CapturedFrame {
    pub rgb: RgbImage,
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Captura V4L2 con buffers mapeados en memoria (MMAP).
pub struct VideoCapture {
    stream: Stream<'static>,
    fourcc: FourCC,
    width: u32,
    height: u32,
}

impl VideoCapture {
    /// Abre el dispositivo y negocia formato y cadencia. El driver puede
    /// ajustar los valores pedidos a los más cercanos que soporte.
    pub fn open(cfg: &CameraConfig) -> Result<Self> {
        let dev = Device::with_path(&cfg.device_path)?;

        let b = cfg.fourcc.as_bytes();
        if b.len() != 4 {
            return Err(anyhow!("FourCC debe tener 4 caracteres"));
        }

        let mut fmt = dev.format()?;
        fmt.fourcc = FourCC::new(&[b[0], b[1], b[2], b[3]]);
        fmt.width = cfg.width;
        fmt.height = cfg.height;
        let actual = dev.set_format(&fmt)?;

        let mut params = dev.params()?;
        params.interval.numerator = 1;
        params.interval.denominator = cfg.fps;
        let _ = dev.set_params(&params);

        // El stream exige 'static: el dispositivo vive lo que dure el proceso.
        let dev_static: &'static Device = Box::leak(Box::new(dev));
        let stream = Stream::with_buffers(dev_static, v4l::buffer::Type::VideoCapture, 4)?;

        tracing::info!(
            "Cámara {} abierta: {}x{} [{}] a {} FPS",
            cfg.device_path,
            actual.width,
            actual.height,
            actual.fourcc,
            cfg.fps
        );

        Ok(Self {
            stream,
            fourcc: actual.fourcc,
            width: actual.width,
            height: actual.height,
        })
    }

    /// Siguiente frame, en RGB y JPEG.
    pub fn grab(&mut self) -> Result<CapturedFrame> {
        let (data, _) = self.stream.next()?;

        match self.fourcc.str().map_err(|_| anyhow!("FourCC ilegible"))? {
            "MJPG" => {
                // MJPG ya es una secuencia de JPEGs
                let rgb = image::load_from_memory_with_format(data, ImageFormat::Jpeg)?.to_rgb8();
                Ok(CapturedFrame {
                    rgb,
                    jpeg: data.to_vec(),
                    width: self.width,
                    height: self.height,
                })
            }
            "YUYV" => {
                let rgb = yuyv_to_rgb(data, self.width, self.height);
                let mut jpeg = Vec::new();
                let mut enc = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut jpeg, 80);
                enc.encode(
                    rgb.as_raw(),
                    self.width,
                    self.height,
                    image::ExtendedColorType::Rgb8,
                )?;
                Ok(CapturedFrame {
                    rgb,
                    jpeg,
                    width: self.width,
                    height: self.height,
                })
            }
            other => Err(anyhow!("Formato {} sin conversión en este nodo", other)),
        }
    }
}

/// Conversión YUYV (YUV 4:2:2) a RGB con las fórmulas BT.601. Cada bloque
/// de 4 bytes `[Y0, U, Y1, V]` describe dos píxeles contiguos.
fn yuyv_to_rgb(yuyv: &[u8], w: u32, h: u32) -> RgbImage {
    let mut out = RgbImage::new(w, h);

    let to_rgb = |y: f32, u: f32, v: f32| {
        [
            (y + 1.402 * v).clamp(0.0, 255.0) as u8,
            (y - 0.344_136 * u - 0.714_136 * v).clamp(0.0, 255.0) as u8,
            (y + 1.772 * u).clamp(0.0, 255.0) as u8,
        ]
    };

    for (i, chunk) in yuyv.chunks_exact(4).enumerate() {
        let u = chunk[1] as f32 - 128.0;
        let v = chunk[3] as f32 - 128.0;

        let x = (i as u32 * 2) % w;
        let y = (i as u32 * 2) / w;
        if y >= h {
            break;
        }

        out.put_pixel(x, y, image::Rgb(to_rgb(chunk[0] as f32, u, v)));
        if x + 1 < w {
            out.put_pixel(x + 1, y, image::Rgb(to_rgb(chunk[2] as f32, u, v)));
        }
    }
    out
}
