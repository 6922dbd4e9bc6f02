//! Per-image segmentation: threshold, labeling, optional watershed split.

pub mod background;
pub mod distance;
pub mod labeling;
pub mod sliding_window;
pub mod threshold;
pub mod watershed;


use crate::common::Buffer2;
use crate::segmentation::labeling::{label_mask, ImageObject};
use crate::segmentation::threshold::Thresholder;
use crate::segmentation::watershed::split_object;

/// Segment one image into connected objects.
///
/// With `split` enabled, every labeled object is cut along the watershed
/// ridges of its own distance map and each basin is returned separately.
pub fn segment_image(image: &Buffer2<u16>, thresholder: &Thresholder, split: bool) -> Vec<ImageObject> {
    let objects = label_mask(&thresholder.threshold(image));
    if !split {
        return objects;
    }
    let foreground = thresholder.config().foreground;
    objects
        .iter()
        .flat_map(|object| split_object(object, foreground))
        .collect()
}
