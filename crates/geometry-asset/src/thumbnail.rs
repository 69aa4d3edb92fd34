use std::io::Cursor;

use glam::Vec2;
use image::{DynamicImage, ImageError, ImageFormat, Rgba, RgbaImage};

use crate::submesh::{PrimitiveTopology, Submesh};

/// Produces the preview image stored in an asset header.
pub trait ThumbnailRenderer {
    type Error: std::error::Error;

    /// Encoded image bytes, stored verbatim.
    fn render(&self, submesh: &Submesh) -> Result<Vec<u8>, Self::Error>;
}

const BACKGROUND: Rgba<u8> = Rgba([40, 40, 40, 255]);
const FOREGROUND: Rgba<u8> = Rgba([230, 230, 230, 255]);
const MARGIN: f32 = 0.1;

/// Software renderer drawing a front view of the submesh as a PNG.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectionThumbnail {
    /// Width and height in pixels.
    pub size: u32,
}

impl Default for ProjectionThumbnail {
    fn default() -> Self {
        Self { size: 90 }
    }
}

fn plot(image: &mut RgbaImage, point: Vec2) {
    let point = point.round();
    if point.x < 0.0 || point.y < 0.0 {
        return;
    }
    let (x, y) = (point.x as u32, point.y as u32);
    if x < image.width() && y < image.height() {
        image.put_pixel(x, y, FOREGROUND);
    }
}

fn draw_line(image: &mut RgbaImage, from: Vec2, to: Vec2) {
    let steps = (to - from).abs().max_element().ceil().max(1.0) as u32;
    for step in 0..=steps {
        plot(image, from.lerp(to, step as f32 / steps as f32));
    }
}

impl ProjectionThumbnail {
    fn draw(&self, submesh: &Submesh) -> RgbaImage {
        let size = self.size.max(1);
        let mut image = RgbaImage::from_pixel(size, size, BACKGROUND);

        let positions: Vec<Vec2> = submesh
            .position_values()
            .map(|[x, y, _]| Vec2::new(x, y))
            .collect();
        let finite = || positions.iter().copied().filter(|point| point.is_finite());
        let Some(first) = finite().next() else {
            return image;
        };
        let (min, max) = finite().fold((first, first), |(min, max), point| {
            (min.min(point), max.max(point))
        });

        let span = (size - 1) as f32;
        let scale = span * (1.0 - 2.0 * MARGIN) / (max - min).max_element().max(f32::EPSILON);
        let center = (min + max) * 0.5;
        // Image rows grow downwards.
        let project = |point: Vec2| {
            let offset = (point - center) * scale;
            Vec2::new(span * 0.5 + offset.x, span * 0.5 - offset.y)
        };
        let vertex = |index: u32| {
            positions
                .get(index as usize)
                .filter(|point| point.is_finite())
                .map(|point| project(*point))
        };

        if submesh.primitive_topology() == PrimitiveTopology::TriangleList {
            let indices: Vec<u32> = submesh.index_values().collect();
            for triangle in indices.chunks_exact(3) {
                for (a, b) in [(0, 1), (1, 2), (2, 0)] {
                    if let (Some(from), Some(to)) = (vertex(triangle[a]), vertex(triangle[b])) {
                        draw_line(&mut image, from, to);
                    }
                }
            }
        } else {
            for point in finite() {
                plot(&mut image, project(point));
            }
        }

        image
    }
}

impl ThumbnailRenderer for ProjectionThumbnail {
    type Error = ImageError;

    fn render(&self, submesh: &Submesh) -> Result<Vec<u8>, Self::Error> {
        let image = self.draw(submesh);
        let mut bytes = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(image).write_to(&mut bytes, ImageFormat::Png)?;
        Ok(bytes.into_inner())
    }
}
