use std::{fs::File, io::BufReader, io::Read, path::Path};

use log::info;
use serde::Deserialize;

use super::{one_hot, out_of_range, DataProvider, TrainingExample};
use crate::{NetErr, Result};

/// The amount of pixels in a 28x28 image.
pub const IMAGE_PIXELS: usize = 784;

/// A grayscale image and its class, as written by the corpus preparation script.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LabeledImage {
    pub label: usize,
    /// Row-major pixel intensities in `0..=255`.
    pub data: Vec<u8>,
}

/// A labeled image corpus that starts out unloaded.
///
/// Batches drawn before `load_json`/`load_path` succeed fail with `DatasetNotLoaded`,
/// which callers can retry once loading completes.
#[derive(Debug, Clone)]
pub struct LabeledImages {
    name: &'static str,
    classes: usize,
    images: Option<Vec<LabeledImage>>,
}

impl LabeledImages {
    /// Creates an empty, unloaded corpus.
    ///
    /// # Arguments
    /// * `name` - Used in errors and logs, e.g. `"digits train"`.
    /// * `classes` - The amount of classes, that is, the width of the one-hot outputs.
    pub fn new(name: &'static str, classes: usize) -> Self {
        Self {
            name,
            classes,
            images: None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.images.is_some()
    }

    /// Loads the corpus from a JSON array of `{"label": .., "data": [..]}` objects.
    ///
    /// # Errors
    /// * `Json` if the reader doesn't hold such an array.
    /// * `ShapeMismatch` if an image doesn't have `IMAGE_PIXELS` pixels or its label isn't
    ///   below the amount of classes. The corpus stays as it was.
    pub fn load_json<R: Read>(&mut self, reader: R) -> Result<()> {
        let images: Vec<LabeledImage> = serde_json::from_reader(reader)?;

        for image in &images {
            if image.data.len() != IMAGE_PIXELS {
                return Err(NetErr::ShapeMismatch {
                    what: "image pixels",
                    got: image.data.len(),
                    expected: IMAGE_PIXELS,
                });
            }

            if image.label >= self.classes {
                return Err(NetErr::ShapeMismatch {
                    what: "image label",
                    got: image.label,
                    expected: self.classes,
                });
            }
        }

        info!("loaded {} images into the {} set", images.len(), self.name);
        self.images = Some(images);
        Ok(())
    }

    /// Loads the corpus from a JSON file, see `load_json`.
    pub fn load_path<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let file = File::open(path)?;
        self.load_json(BufReader::new(file))
    }

    fn images(&self) -> Result<&[LabeledImage]> {
        self.images
            .as_deref()
            .ok_or(NetErr::DatasetNotLoaded { dataset: self.name })
    }
}

impl DataProvider for LabeledImages {
    fn input_width(&self) -> usize {
        IMAGE_PIXELS
    }

    fn output_width(&self) -> usize {
        self.classes
    }

    /// `0` until the corpus is loaded.
    fn len(&self) -> usize {
        self.images.as_ref().map_or(0, Vec::len)
    }

    fn example(&self, index: usize) -> Result<TrainingExample> {
        let images = self.images()?;
        let image = images
            .get(index)
            .ok_or_else(|| out_of_range(index, images.len()))?;
        let inputs = image.data.iter().map(|&p| p as f32 / 255.).collect();

        Ok(TrainingExample::new(
            inputs,
            one_hot(image.label, self.classes),
        ))
    }

    fn ready(&self) -> Result<()> {
        self.images().map(|_| ())
    }
}
