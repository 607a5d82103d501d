//! Symmetric zero-pad / center-crop of a 2-D spectrogram to a fixed shape.
//!
//! Each axis is handled independently. When the pad or crop amount is odd the
//! extra row or column goes to the trailing side.

/// Row-major real matrix, rows are frequency and columns are frames.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrogramImage {
    pub height: usize,
    pub width: usize,
    pub data: Vec<f32>,
}

impl SpectrogramImage {
    pub fn from_fn(height: usize, width: usize, mut f: impl FnMut(usize, usize) -> f32) -> Self {
        let mut data = Vec::with_capacity(height * width);
        for row in 0..height {
            for col in 0..width {
                data.push(f(row, col));
            }
        }
        SpectrogramImage { height, width, data }
    }

    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[row * self.width + col]
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn map(&self, f: impl Fn(f32) -> f32) -> Self {
        SpectrogramImage {
            height: self.height,
            width: self.width,
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }
}

/// Shift from source index to resized index along one axis.
fn axis_offset(current: usize, target: usize) -> isize {
    if current < target {
        ((target - current) / 2) as isize
    } else {
        -(((current - target) / 2) as isize)
    }
}

fn shifted(index: usize, offset: isize, bound: usize) -> Option<usize> {
    let i = index as isize - offset;
    (i >= 0 && (i as usize) < bound).then_some(i as usize)
}

pub fn resize(image: &SpectrogramImage, target: (usize, usize)) -> SpectrogramImage {
    let (height, width) = target;
    let row_offset = axis_offset(image.height, height);
    let col_offset = axis_offset(image.width, width);
    SpectrogramImage::from_fn(height, width, |row, col| {
        match (
            shifted(row, row_offset, image.height),
            shifted(col, col_offset, image.width),
        ) {
            (Some(r), Some(c)) => image.get(r, c),
            _ => 0.0,
        }
    })
}

/// Maps a resized image back onto `original`'s shape.
///
/// Cells that were cropped away by [`resize`] keep their value from `original`;
/// padding cells of `resized` are dropped.
pub fn restore(resized: &SpectrogramImage, original: &SpectrogramImage) -> SpectrogramImage {
    let row_offset = axis_offset(original.height, resized.height);
    let col_offset = axis_offset(original.width, resized.width);
    SpectrogramImage::from_fn(original.height, original.width, |row, col| {
        let r = row as isize + row_offset;
        let c = col as isize + col_offset;
        if (0..resized.height as isize).contains(&r) && (0..resized.width as isize).contains(&c) {
            resized.get(r as usize, c as usize)
        } else {
            original.get(row, col)
        }
    })
}
