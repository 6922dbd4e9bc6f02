//! Batch driver from file lists to clusters.
//!
//! ```text
//! Init -> SegmentInitial -> Sample -> (SegmentExtended -> Sample)* -> Done
//! ```
//!
//! The first batch of `load_cycle` cycles founds the clusters; every later
//! batch only appends readings. Later batches are registered against the
//! previous batch's reference image, appended as a synthetic last cycle and
//! dropped again once the offsets are known, so all batches share the
//! founding frame.

mod batch;


pub use batch::CycleBatch;

use rayon::prelude::*;

use crate::cluster::{assemble, Cluster, RAW_SIGNAL};
use crate::common::{try_par_map_limited, Buffer2};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::image::source::{FileLists, ImageSource};
use crate::image::Image;
use crate::registration::Registrar;
use crate::segmentation::background::subtract_background;
use crate::segmentation::labeling::ImageObject;
use crate::segmentation::segment_image;
use crate::segmentation::threshold::Thresholder;

/// Driver state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Init,
    SegmentInitial,
    Sample,
    SegmentExtended,
    Done,
}

/// Runs segmentation, registration and sampling over all cycles.
pub struct Pipeline<'a> {
    config: Config,
    files: FileLists,
    source: &'a dyn ImageSource,
    registrar: &'a dyn Registrar,
    thresholder: Thresholder,

    stage: Stage,
    /// Absolute index of the next cycle to load.
    next_cycle: usize,
    batch: Option<CycleBatch>,
    /// Reference image of the last registered batch, in the founding frame.
    reference: Option<Buffer2<u16>>,
    /// Frame size fixed by the first loaded image.
    frame: Option<(usize, usize)>,
    clusters: Vec<Cluster>,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: Config,
        files: FileLists,
        source: &'a dyn ImageSource,
        registrar: &'a dyn Registrar,
    ) -> Self {
        config.validate();
        let thresholder = Thresholder::new(config.threshold.clone());
        Self {
            config,
            files,
            source,
            registrar,
            thresholder,
            stage: Stage::Init,
            next_cycle: 0,
            batch: None,
            reference: None,
            frame: None,
            clusters: Vec::new(),
        }
    }

    #[inline]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Clusters found so far; empty before the initial segmentation.
    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    /// Drive all stages to completion.
    pub fn run(mut self) -> Result<Vec<Cluster>> {
        while self.step()? != Stage::Done {}
        Ok(self.clusters)
    }

    /// Advance one stage and return the new one.
    ///
    /// An error is final: the pipeline must not be stepped again.
    pub fn step(&mut self) -> Result<Stage> {
        self.stage = match self.stage {
            Stage::Init => {
                tracing::info!(
                    channels = self.files.num_channels(),
                    cycles = self.files.num_cycles(),
                    load_cycle = self.config.load_cycle,
                    "starting pipeline"
                );
                Stage::SegmentInitial
            }
            Stage::SegmentInitial => {
                self.segment_initial()?;
                Stage::Sample
            }
            Stage::Sample => {
                self.sample();
                if self.next_cycle < self.files.num_cycles() {
                    Stage::SegmentExtended
                } else {
                    tracing::info!(
                        clusters = self.clusters.len(),
                        cycles = self.next_cycle,
                        "pipeline finished"
                    );
                    Stage::Done
                }
            }
            Stage::SegmentExtended => {
                self.segment_extended()?;
                Stage::Sample
            }
            Stage::Done => Stage::Done,
        };
        Ok(self.stage)
    }

    // ========================================================================
    // Stages
    // ========================================================================

    fn segment_initial(&mut self) -> Result<()> {
        let mut batch = self.load_batch()?;
        let reference_cycle = self.config.reference_cycle.min(batch.num_cycles() - 1);

        let transforms = self.registrar.register(&batch, reference_cycle);
        batch.apply_transforms(&transforms);

        let objects = self.segment_batch(&batch);
        let (width, height) = batch.frame_size();
        let clusters = assemble(&objects, width, height);
        self.check_cluster_count(clusters.len())?;

        tracing::info!(
            objects = objects.len(),
            clusters = clusters.len(),
            "initial segmentation complete"
        );

        self.reference = Some(self.batch_reference(&batch, reference_cycle));
        self.clusters = clusters;
        self.batch = Some(batch);
        Ok(())
    }

    fn segment_extended(&mut self) -> Result<()> {
        let mut batch = self.load_batch()?;
        let Some(reference) = self.reference.take() else {
            unreachable!("extended segmentation runs after the initial batch");
        };

        let synthetic = vec![Image::new(reference); batch.num_channels()];
        batch.push_cycle(synthetic);
        let transforms = self.registrar.register(&batch, batch.num_cycles() - 1);
        batch.pop_cycle();

        let transforms: Vec<_> = transforms
            .into_iter()
            .map(|mut channel| {
                channel.truncate(batch.num_cycles());
                channel
            })
            .collect();
        batch.apply_transforms(&transforms);

        let reference_cycle = self.config.reference_cycle.min(batch.num_cycles() - 1);
        self.reference = Some(self.batch_reference(&batch, reference_cycle));
        tracing::debug!(
            first_cycle = batch.first_cycle(),
            cycles = batch.num_cycles(),
            "extended batch registered"
        );
        self.batch = Some(batch);
        Ok(())
    }

    fn sample(&mut self) {
        let Some(batch) = self.batch.take() else {
            return;
        };
        let num_channels = batch.num_channels();

        self.clusters.par_iter_mut().for_each(|cluster| {
            for cycle in 0..batch.num_cycles() {
                let images: Vec<&Image> = (0..num_channels)
                    .map(|ch| batch.image(ch, cycle))
                    .collect();
                let reading = cluster.read(&images);
                cluster.push_reading(RAW_SIGNAL, reading);
            }
        });

        tracing::debug!(
            first_cycle = batch.first_cycle(),
            cycles = batch.num_cycles(),
            clusters = self.clusters.len(),
            "sampled batch"
        );
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Load, crop and background-subtract the next `load_cycle` cycles.
    fn load_batch(&mut self) -> Result<CycleBatch> {
        let first = self.next_cycle;
        let count = self
            .config
            .load_cycle
            .min(self.files.num_cycles() - first);
        let num_channels = self.files.num_channels();

        let jobs: Vec<(usize, usize)> = (0..num_channels)
            .flat_map(|ch| (first..first + count).map(move |cy| (ch, cy)))
            .collect();

        let images = try_par_map_limited(&jobs, self.config.max_concurrent_loads, |&(ch, cy)| {
            self.load_image(ch, cy)
        })?;

        for (&(ch, cy), image) in jobs.iter().zip(&images) {
            let size = (image.width(), image.height());
            match self.frame {
                None => self.frame = Some(size),
                Some(expected) if expected != size => {
                    return Err(Error::DimensionMismatch {
                        path: self.files.path(ch, cy).to_path_buf(),
                        expected,
                        actual: size,
                    });
                }
                Some(_) => {}
            }
        }

        let mut channels: Vec<Vec<Image>> = vec![Vec::with_capacity(count); num_channels];
        for (&(ch, _), image) in jobs.iter().zip(images) {
            channels[ch].push(image);
        }

        self.next_cycle = first + count;
        tracing::info!(first_cycle = first, cycles = count, "loaded batch");
        Ok(CycleBatch::new(first, channels))
    }

    fn load_image(&self, channel: usize, cycle: usize) -> Result<Image> {
        let path = self.files.path(channel, cycle);
        let pixels = self.source.load(path)?;
        let mut image = Image::new(pixels);
        if let Some(crop) = &self.config.crop {
            image = image.crop(crop);
        }
        if self.config.background.enabled {
            image = Image::new(subtract_background(image.buffer(), self.config.background.window));
        }
        Ok(image)
    }

    /// Threshold, label and split the segmentation cycles of every channel.
    fn segment_batch(&self, batch: &CycleBatch) -> Vec<ImageObject> {
        let cycles = self.config.segment_cycles.min(batch.num_cycles());
        let jobs: Vec<(usize, usize)> = (0..batch.num_channels())
            .flat_map(|ch| (0..cycles).map(move |cy| (ch, cy)))
            .collect();

        let per_image: Vec<Vec<ImageObject>> = jobs
            .par_iter()
            .map(|&(ch, cy)| {
                let pixels = batch.image(ch, cy).resample();
                let objects = segment_image(&pixels, &self.thresholder, self.config.watershed);
                tracing::debug!(
                    channel = ch,
                    cycle = cy,
                    objects = objects.len(),
                    "segmented image"
                );
                objects
            })
            .collect();

        per_image.into_iter().flatten().collect()
    }

    fn batch_reference(&self, batch: &CycleBatch, reference_cycle: usize) -> Buffer2<u16> {
        batch.aggregate(reference_cycle, self.config.correlation.aggregate_cycles)
    }

    fn check_cluster_count(&self, found: usize) -> Result<()> {
        if found < self.config.min_clusters {
            tracing::error!(found, min = self.config.min_clusters, "too few clusters");
            return Err(Error::TooFewClusters {
                found,
                min: self.config.min_clusters,
            });
        }
        if found > self.config.max_clusters {
            tracing::error!(found, max = self.config.max_clusters, "too many clusters");
            return Err(Error::TooManyClusters {
                found,
                max: self.config.max_clusters,
            });
        }
        Ok(())
    }
}
