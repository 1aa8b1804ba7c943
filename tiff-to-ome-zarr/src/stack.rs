//! Loading a multi-page TIFF into a dense Z-Y-X stack.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use log::debug;
use ndarray::{ArcArray, Array3, Axis, Ix5};
use tiff::decoder::{Decoder, DecodingResult, Limits};

use crate::error::{Error, Result};
use crate::voxel::Voxel;

/// A generic operation over a stack of any supported element type.
pub trait StackVisitor {
    type Output;

    fn visit<T: Voxel>(self, stack: Array3<T>) -> Self::Output;
}

macro_rules! source_stack {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        /// A Z-Y-X stack with its concrete element type.
        #[derive(Debug, Clone, PartialEq)]
        pub enum SourceStack {
            $($variant(Array3<$ty>),)*
        }

        impl SourceStack {
            pub fn shape(&self) -> &[usize] {
                match self {
                    $(Self::$variant(stack) => stack.shape(),)*
                }
            }

            pub fn dtype(&self) -> &'static str {
                match self {
                    $(Self::$variant(_) => <$ty as Voxel>::NAME,)*
                }
            }

            /// Hands the owned stack to `visitor` with its element type.
            pub fn visit<V: StackVisitor>(self, visitor: V) -> V::Output {
                match self {
                    $(Self::$variant(stack) => visitor.visit(stack),)*
                }
            }
        }

        $(
            impl From<Array3<$ty>> for SourceStack {
                fn from(stack: Array3<$ty>) -> Self {
                    Self::$variant(stack)
                }
            }
        )*

        fn samples_in(page: &DecodingResult) -> Option<usize> {
            match page {
                $(DecodingResult::$variant(samples) => Some(samples.len()),)*
                _ => None,
            }
        }

        fn append_page(stack: DecodingResult, page: DecodingResult) -> Option<DecodingResult> {
            match (stack, page) {
                $(
                    (DecodingResult::$variant(mut stack), DecodingResult::$variant(page)) => {
                        stack.extend(page);
                        Some(DecodingResult::$variant(stack))
                    }
                )*
                _ => None,
            }
        }

        fn into_stack(
            samples: DecodingResult,
            shape: (usize, usize, usize),
        ) -> Option<SourceStack> {
            match samples {
                $(
                    DecodingResult::$variant(samples) => Array3::from_shape_vec(shape, samples)
                        .ok()
                        .map(SourceStack::$variant),
                )*
                _ => None,
            }
        }
    };
}

source_stack! {
    U8 => u8,
    U16 => u16,
    U32 => u32,
    U64 => u64,
    I8 => i8,
    I16 => i16,
    I32 => i32,
    I64 => i64,
    F32 => f32,
    F64 => f64,
}

/// Reads every page of the TIFF at `path` into one Z-Y-X stack.
///
/// All pages must be single-sample and share width, height and sample type.
/// No type conversion happens; each page buffer is released as soon as it has
/// been appended.
pub fn read_tiff_stack(path: &Path) -> Result<SourceStack> {
    if !path.is_file() {
        return Err(Error::NotFound(path.to_path_buf()));
    }
    let file = File::open(path)?;
    let mut decoder = Decoder::new(BufReader::new(file))
        .map_err(|e| Error::format(path, e))?
        .with_limits(Limits::unlimited());

    let (width, height) = decoder.dimensions().map_err(|e| Error::format(path, e))?;
    let plane = width as usize * height as usize;
    let mut samples: Option<DecodingResult> = None;
    let mut pages = 0usize;

    loop {
        let dims = decoder.dimensions().map_err(|e| Error::format(path, e))?;
        if dims != (width, height) {
            return Err(Error::format(
                path,
                format!(
                    "page {pages} is {}x{}, expected {width}x{height}",
                    dims.0, dims.1
                ),
            ));
        }
        let page = decoder.read_image().map_err(|e| Error::format(path, e))?;
        match samples_in(&page) {
            Some(len) if len == plane => {}
            Some(len) => {
                return Err(Error::format(
                    path,
                    format!("page {pages} has {len} samples, expected {plane} (single channel)"),
                ))
            }
            None => return Err(Error::format(path, "unsupported sample type")),
        }
        samples = match samples {
            None => Some(page),
            Some(stack) => Some(append_page(stack, page).ok_or_else(|| {
                Error::format(path, format!("page {pages} changes the sample type"))
            })?),
        };
        pages += 1;
        debug!("decoded page {pages} of {}", path.display());

        if !decoder.more_images() {
            break;
        }
        decoder.next_image().map_err(|e| Error::format(path, e))?;
    }

    let samples = samples.ok_or_else(|| Error::format(path, "no pages"))?;
    into_stack(samples, (pages, height as usize, width as usize))
        .ok_or_else(|| Error::format(path, "sample count does not match the page layout"))
}

/// Lifts a Z-Y-X stack to T-C-Z-Y-X by prepending two singleton axes.
///
/// The buffer is moved, not copied; the returned array is its sole owner.
pub fn canonicalize<T: Clone>(stack: Array3<T>) -> ArcArray<T, Ix5> {
    stack
        .insert_axis(Axis(0))
        .insert_axis(Axis(0))
        .into_shared()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tiff::encoder::{colortype, TiffEncoder};

    fn write_pages(path: &Path, width: u32, height: u32, pages: &[Vec<u16>]) {
        let file = File::create(path).unwrap();
        let mut encoder = TiffEncoder::new(file).unwrap();
        for page in pages {
            encoder
                .write_image::<colortype::Gray16>(width, height, page.as_slice())
                .unwrap();
        }
    }

    #[test]
    fn reads_pages_as_z_axis() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stack.tif");
        let pages: Vec<Vec<u16>> = (0..3u16)
            .map(|z| (0..12u16).map(|i| z * 100 + i).collect())
            .collect();
        write_pages(&path, 4, 3, &pages);

        let stack = read_tiff_stack(&path).unwrap();
        assert_eq!(stack.shape(), &[3, 3, 4]);
        assert_eq!(stack.dtype(), "uint16");
        let SourceStack::U16(stack) = stack else {
            panic!("expected a uint16 stack");
        };
        assert_eq!(stack[[0, 0, 0]], 0);
        assert_eq!(stack[[1, 2, 3]], 111);
        assert_eq!(stack[[2, 1, 0]], 204);
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_tiff_stack(&dir.path().join("absent.tif")).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        // a directory is not a regular file either
        let err = read_tiff_stack(dir.path()).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn garbage_is_a_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.tif");
        fs::write(&path, b"definitely not a tiff").unwrap();
        let err = read_tiff_stack(&path).unwrap_err();
        assert!(matches!(err, Error::Format { .. }));
    }

    #[test]
    fn mismatched_pages_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ragged.tif");
        let file = File::create(&path).unwrap();
        let mut encoder = TiffEncoder::new(file).unwrap();
        encoder
            .write_image::<colortype::Gray16>(2, 2, &[1, 2, 3, 4])
            .unwrap();
        encoder
            .write_image::<colortype::Gray16>(3, 1, &[1, 2, 3])
            .unwrap();
        drop(encoder);

        let err = read_tiff_stack(&path).unwrap_err();
        assert!(matches!(err, Error::Format { .. }));
    }

    #[test]
    fn canonical_stack_shares_the_buffer() {
        let stack = Array3::from_shape_fn((2, 3, 4), |(z, y, x)| (z * 12 + y * 4 + x) as u8);
        let ptr = stack.as_ptr();
        let canonical = canonicalize(stack);
        assert_eq!(canonical.shape(), &[1, 1, 2, 3, 4]);
        assert_eq!(canonical.as_ptr(), ptr);
        assert_eq!(canonical[[0, 0, 1, 2, 3]], 23);
    }
}
