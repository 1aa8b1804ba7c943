use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, warn};
use ndarray::ArrayView5;
use zarrs::array::codec::bytes_to_bytes::blosc::{
    BloscCodec, BloscCompressionLevel, BloscCompressor, BloscShuffleMode,
};
use zarrs::array::{Array, ArrayBuilder, FillValue};
use zarrs::filesystem::FilesystemStore;
use zarrs::group::GroupBuilder;

use crate::error::{Error, Result};
use crate::ngff::{
    self, Channel, CoordinateTransformation, Multiscale, Ome, OmeAttributes, Omero, Window,
};
use crate::voxel::Voxel;

pub type Store = Arc<FilesystemStore>;

/// Target chunk shape of every level, clamped per axis to the level shape.
pub const CHUNK_SHAPE: [u64; 5] = [1, 1, 256, 256, 256];

pub const AXIS_NAMES: [&str; 5] = ["t", "c", "z", "y", "x"];

const CHANNEL_COLOR: &str = "FFFFFF";

#[derive(Debug, Clone, PartialEq)]
pub struct LevelRecord {
    pub name: String,
    pub shape: Vec<u64>,
    pub dtype: &'static str,
}

/// A create-only OME-Zarr image holding one array per pyramid level.
///
/// Group metadata is rewritten after every level and once more on close or
/// drop, so an aborted run leaves a readable dataset containing the levels
/// stored so far.
pub struct OmeZarrDataset {
    store: Store,
    path: PathBuf,
    channel_names: Vec<String>,
    levels: Vec<LevelRecord>,
    window: Option<Window>,
    closed: bool,
}

pub fn open_store(root: &Path) -> Result<Store> {
    let store = FilesystemStore::new(root).map_err(Error::wrap)?;
    Ok(Arc::new(store))
}

impl OmeZarrDataset {
    /// Creates a new dataset at `path`, which must not exist yet.
    pub fn create(path: &Path, channel_names: &[String]) -> Result<Self> {
        if path.exists() {
            return Err(Error::write(format!(
                "output already exists: {}",
                path.display()
            )));
        }
        let store = open_store(path)?;
        let dataset = Self {
            store,
            path: path.to_path_buf(),
            channel_names: channel_names.to_vec(),
            levels: Vec::new(),
            window: None,
            closed: false,
        };
        dataset.store_group_metadata()?;
        Ok(dataset)
    }

    pub fn levels(&self) -> &[LevelRecord] {
        &self.levels
    }

    /// Creates array `name` with the shape and element type of `data` and
    /// writes all of `data` into it.
    pub fn write_level<T: Voxel>(&mut self, name: &str, data: ArrayView5<'_, T>) -> Result<()> {
        let array_path = format!("/{name}");
        if self.levels.iter().any(|level| level.name == name)
            || Array::open(self.store.clone(), &array_path).is_ok()
        {
            return Err(Error::write(format!(
                "array {name:?} already exists in {}",
                self.path.display()
            )));
        }

        let shape: Vec<u64> = data.shape().iter().map(|&len| len as u64).collect();
        let array = create_array::<T>(&self.store, &array_path, shape.clone())?;
        let data = data.as_standard_layout();
        let elements = data
            .as_slice()
            .ok_or_else(|| Error::write("level buffer is not contiguous"))?;
        array
            .store_array_subset(&array.subset_all(), elements)
            .map_err(Error::wrap)?;
        debug!("stored array {array_path} with shape {shape:?}");

        if self.window.is_none() {
            self.window = Some(Window::full_range(T::window()));
        }
        self.levels.push(LevelRecord {
            name: name.to_string(),
            shape,
            dtype: T::NAME,
        });
        self.store_group_metadata()
    }

    /// Renders the hierarchy: the root, then one line per array.
    pub fn tree(&self) -> String {
        let root = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "/".to_string());
        let mut out = format!("{root}\n");
        for (i, level) in self.levels.iter().enumerate() {
            let branch = if i + 1 == self.levels.len() {
                "└──"
            } else {
                "├──"
            };
            let shape: Vec<String> = level.shape.iter().map(u64::to_string).collect();
            out.push_str(&format!(
                " {branch} {} ({}) {}\n",
                level.name,
                shape.join(", "),
                level.dtype
            ));
        }
        out
    }

    /// Flushes group metadata and releases the dataset.
    pub fn close(mut self) -> Result<()> {
        self.closed = true;
        self.store_group_metadata()
    }

    fn attributes(&self) -> OmeAttributes {
        let base = self.levels.first().map(|level| level.shape.clone());
        let datasets = self
            .levels
            .iter()
            .map(|level| ngff::Dataset {
                path: level.name.clone(),
                coordinate_transformations: vec![CoordinateTransformation::Scale {
                    scale: ngff::relative_scale(
                        base.as_deref().unwrap_or(&level.shape),
                        &level.shape,
                    ),
                }],
            })
            .collect();
        let window = self.window.unwrap_or(Window::full_range((0.0, 1.0)));
        OmeAttributes {
            ome: Ome {
                version: ngff::NGFF_VERSION,
                multiscales: vec![Multiscale {
                    name: self
                        .path
                        .file_stem()
                        .map(|stem| stem.to_string_lossy().into_owned()),
                    axes: ngff::tczyx_axes(),
                    datasets,
                }],
                omero: Some(Omero {
                    channels: self
                        .channel_names
                        .iter()
                        .map(|label| Channel {
                            label: label.clone(),
                            color: CHANNEL_COLOR,
                            active: true,
                            window,
                        })
                        .collect(),
                }),
            },
        }
    }

    fn store_group_metadata(&self) -> Result<()> {
        let attributes = match serde_json::to_value(self.attributes()).map_err(Error::wrap)? {
            serde_json::Value::Object(map) => map,
            _ => return Err(Error::write("group attributes must be a JSON object")),
        };
        let group = GroupBuilder::new()
            .attributes(attributes)
            .build(self.store.clone(), "/")
            .map_err(Error::wrap)?;
        group.store_metadata().map_err(Error::wrap)?;
        Ok(())
    }
}

impl Drop for OmeZarrDataset {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.store_group_metadata() {
            warn!("failed to flush metadata of {}: {e}", self.path.display());
        }
    }
}

/// Chunk shape for an array of `shape`, never larger than the array itself.
pub fn clamp_chunks(shape: &[u64]) -> Vec<u64> {
    shape
        .iter()
        .zip(CHUNK_SHAPE)
        .map(|(&len, chunk)| chunk.min(len).max(1))
        .collect()
}

fn create_array<T: Voxel>(
    store: &Store,
    path: &str,
    shape: Vec<u64>,
) -> Result<Array<FilesystemStore>> {
    let chunk_shape = clamp_chunks(&shape);
    let level = BloscCompressionLevel::try_from(1u8)
        .map_err(|_| Error::write("invalid blosc compression level"))?;
    let blosc = BloscCodec::new(
        BloscCompressor::Zstd,
        level,
        None,
        BloscShuffleMode::BitShuffle,
        Some(std::mem::size_of::<T>()),
    )
    .map_err(Error::wrap)?;
    let zero = vec![0u8; std::mem::size_of::<T>()];

    let array = ArrayBuilder::new(
        shape,
        chunk_shape,
        T::data_type(),
        FillValue::from(zero.as_slice()),
    )
    .bytes_to_bytes_codecs(vec![Arc::new(blosc)])
    .dimension_names(AXIS_NAMES.into())
    .build(store.clone(), path)
    .map_err(Error::wrap)?;
    array.store_metadata().map_err(Error::wrap)?;
    Ok(array)
}
