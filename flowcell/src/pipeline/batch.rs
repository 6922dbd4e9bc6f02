//! Images of one loaded batch of cycles.

use crate::common::Buffer2;
use crate::image::{Image, PixelTransform};

/// `[channel][cycle]` images of consecutive cycles starting at `first_cycle`.
///
/// All images share the frame size of the batch.
#[derive(Debug, Clone)]
pub struct CycleBatch {
    first_cycle: usize,
    channels: Vec<Vec<Image>>,
}

impl CycleBatch {
    pub fn new(first_cycle: usize, channels: Vec<Vec<Image>>) -> Self {
        assert!(!channels.is_empty(), "batch needs at least one channel");
        let cycles = channels[0].len();
        assert!(
            channels.iter().all(|c| c.len() == cycles),
            "all channels of a batch must hold the same number of cycles"
        );
        Self {
            first_cycle,
            channels,
        }
    }

    /// Absolute index of the batch's first cycle.
    #[inline]
    pub fn first_cycle(&self) -> usize {
        self.first_cycle
    }

    #[inline]
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    #[inline]
    pub fn num_cycles(&self) -> usize {
        self.channels[0].len()
    }

    #[inline]
    pub fn image(&self, channel: usize, cycle: usize) -> &Image {
        &self.channels[channel][cycle]
    }

    pub fn channel(&self, channel: usize) -> &[Image] {
        &self.channels[channel]
    }

    /// Frame size `(width, height)`; `(0, 0)` for a batch without cycles.
    pub fn frame_size(&self) -> (usize, usize) {
        self.channels[0]
            .first()
            .map_or((0, 0), |image| (image.width(), image.height()))
    }

    /// Per-pixel maximum over every channel of `count` cycles starting at
    /// `first`, read through each image's transform. Unreadable pixels
    /// count as 0; the cycle range is clamped to the batch.
    pub fn aggregate(&self, first: usize, count: usize) -> Buffer2<u16> {
        let (width, height) = self.frame_size();
        let last = (first + count).min(self.num_cycles());
        let mut out: Buffer2<u16> = Buffer2::new_default(width, height);
        for channel in &self.channels {
            for image in &channel[first.min(last)..last] {
                for y in 0..height {
                    for x in 0..width {
                        let v = image.sample(x, y).unwrap_or(0);
                        let slot = &mut out[(x, y)];
                        *slot = (*slot).max(v);
                    }
                }
            }
        }
        out
    }

    /// Append one image per channel as a new last cycle.
    pub fn push_cycle(&mut self, images: Vec<Image>) {
        assert_eq!(
            images.len(),
            self.channels.len(),
            "one image per channel is required"
        );
        for (channel, image) in self.channels.iter_mut().zip(images) {
            channel.push(image);
        }
    }

    /// Remove the last cycle, returning its images per channel.
    pub fn pop_cycle(&mut self) -> Option<Vec<Image>> {
        if self.num_cycles() == 0 {
            return None;
        }
        Some(
            self.channels
                .iter_mut()
                .filter_map(|channel| channel.pop())
                .collect(),
        )
    }

    /// Compose registration results into the images. Pixels are not copied.
    pub fn apply_transforms(&mut self, transforms: &[Vec<PixelTransform>]) {
        assert_eq!(transforms.len(), self.channels.len());
        for (channel, offsets) in self.channels.iter_mut().zip(transforms) {
            assert_eq!(offsets.len(), channel.len());
            for (image, &transform) in channel.iter_mut().zip(offsets) {
                *image = image.transformed(transform);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(cycles: usize, channels: usize) -> CycleBatch {
        let images = (0..channels)
            .map(|ch| {
                (0..cycles)
                    .map(|cy| Image::new(Buffer2::new_filled(4, 3, (ch * 10 + cy) as u16)))
                    .collect()
            })
            .collect();
        CycleBatch::new(5, images)
    }

    #[test]
    fn test_dimensions() {
        let b = batch(3, 2);
        assert_eq!(b.first_cycle(), 5);
        assert_eq!(b.num_channels(), 2);
        assert_eq!(b.num_cycles(), 3);
        assert_eq!(b.frame_size(), (4, 3));
        assert_eq!(b.image(1, 2).sample(0, 0), Some(12));
    }

    #[test]
    fn test_push_then_pop_restores_batch() {
        let mut b = batch(2, 2);
        let extra = vec![
            Image::new(Buffer2::new_filled(4, 3, 99)),
            Image::new(Buffer2::new_filled(4, 3, 98)),
        ];
        b.push_cycle(extra);
        assert_eq!(b.num_cycles(), 3);

        let popped = b.pop_cycle().unwrap();
        assert_eq!(popped.len(), 2);
        assert_eq!(popped[0].sample(0, 0), Some(99));
        assert_eq!(popped[1].sample(0, 0), Some(98));
        assert_eq!(b.num_cycles(), 2);
    }

    #[test]
    fn test_aggregate_takes_max_over_channels_and_cycles() {
        let b = batch(3, 2);
        assert_eq!(b.aggregate(0, 1)[(0, 0)], 10);
        assert_eq!(b.aggregate(0, 2)[(2, 1)], 11);
        // Range clamps to the batch.
        assert_eq!(b.aggregate(1, 10)[(3, 2)], 12);
    }

    #[test]
    fn test_apply_transforms_shares_pixels() {
        let pixels = Buffer2::from_fn(4, 1, |x, _| x as u16);
        let mut b = CycleBatch::new(0, vec![vec![Image::new(pixels)]]);
        b.apply_transforms(&[vec![PixelTransform::from_offset(1, 0)]]);

        assert_eq!(b.image(0, 0).sample(0, 0), Some(1));
        assert_eq!(b.image(0, 0).sample(3, 0), None);
    }
}
