//! Pipeline orchestrator: runs the full conversion pipeline.
//!
//! The pipeline runs in three phases:
//!   Phase 1 (0-40%): Input plugin → Document → postprocess
//!   Phase 2 (40-90%): Sequential transforms in registration order
//!   Phase 3 (90-100%): Output plugin → target format

use std::path::Path;
use std::time::Instant;

use log::{debug, info};

use crate::error::{ConvertError, Result};
use crate::options::ConversionOptions;
use crate::plugin::{InputPlugin, OutputPlugin, ProgressReporter, Transform};
use crate::stats::ConversionStats;

/// The conversion pipeline orchestrator.
pub struct Pipeline {
    input_plugin: Box<dyn InputPlugin>,
    output_plugin: Box<dyn OutputPlugin>,
    transforms: Vec<Box<dyn Transform>>,
    progress_reporter: Option<ProgressReporter>,
}

impl Pipeline {
    pub fn new(input_plugin: Box<dyn InputPlugin>, output_plugin: Box<dyn OutputPlugin>) -> Self {
        Self {
            input_plugin,
            output_plugin,
            transforms: Vec::new(),
            progress_reporter: None,
        }
    }

    /// Add a transform to the pipeline.
    /// Transforms are applied in the order they are added.
    pub fn add_transform(&mut self, transform: Box<dyn Transform>) {
        self.transforms.push(transform);
    }

    /// Set a progress reporter callback.
    pub fn set_progress_reporter(&mut self, reporter: ProgressReporter) {
        self.progress_reporter = Some(reporter);
    }

    /// Run the full conversion pipeline and return statistics about the
    /// converted document.
    pub fn run(
        &self,
        input_path: &Path,
        output_path: &Path,
        options: &ConversionOptions,
    ) -> Result<ConversionStats> {
        let started = Instant::now();

        // Phase 1: Input
        self.report_progress(0.0, "Starting conversion...");

        info!("Running {} input plugin...", self.input_plugin.name());
        self.report_progress(0.01, &format!("Running {} plugin", self.input_plugin.name()));

        let mut doc = self.input_plugin.convert(input_path, options)?;
        self.report_progress(0.35, "Input parsing complete");

        self.input_plugin.postprocess(&mut doc, options)?;
        self.report_progress(0.40, "Postprocessing complete");
        debug!(
            "Input produced {} pages, {} images, {} tables",
            doc.page_count(),
            doc.image_count(),
            doc.table_count()
        );

        // Phase 2: Transforms
        let transform_count = self
            .transforms
            .iter()
            .filter(|t| t.should_run(options))
            .count();
        let mut transform_idx = 0;

        for transform in &self.transforms {
            if !transform.should_run(options) {
                info!("Skipping transform: {}", transform.name());
                continue;
            }

            let progress = 0.40 + (0.50 * transform_idx as f64 / transform_count.max(1) as f64);
            info!("Running transform: {}", transform.name());
            self.report_progress(progress, &format!("Running {}", transform.name()));

            transform.apply(&mut doc, options).map_err(|e| {
                ConvertError::Pipeline(format!("Transform '{}' failed: {}", transform.name(), e))
            })?;

            transform_idx += 1;
        }

        self.report_progress(0.90, "All transforms complete");

        // Phase 3: Output
        let output_format = options
            .output_format
            .unwrap_or(self.output_plugin.output_format());
        info!("Running {} output plugin...", self.output_plugin.name());
        self.report_progress(0.90, &format!("Creating {}...", output_format));

        self.output_plugin.convert(&doc, output_path, options)?;

        let stats = ConversionStats::from_document(&doc, started.elapsed());
        self.report_progress(1.0, "Conversion complete");
        info!(
            "{} output written to {}",
            output_format,
            output_path.display()
        );

        Ok(stats)
    }

    fn report_progress(&self, fraction: f64, message: &str) {
        if let Some(ref reporter) = self.progress_reporter {
            reporter(fraction, message);
        }
    }
}

/// Builder for constructing a pipeline.
pub struct PipelineBuilder {
    input_plugin: Option<Box<dyn InputPlugin>>,
    output_plugin: Option<Box<dyn OutputPlugin>>,
    transforms: Vec<Box<dyn Transform>>,
    progress_reporter: Option<ProgressReporter>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            input_plugin: None,
            output_plugin: None,
            transforms: Vec::new(),
            progress_reporter: None,
        }
    }

    pub fn input(mut self, plugin: Box<dyn InputPlugin>) -> Self {
        self.input_plugin = Some(plugin);
        self
    }

    pub fn output(mut self, plugin: Box<dyn OutputPlugin>) -> Self {
        self.output_plugin = Some(plugin);
        self
    }

    pub fn transform(mut self, transform: Box<dyn Transform>) -> Self {
        self.transforms.push(transform);
        self
    }

    pub fn transforms(mut self, transforms: Vec<Box<dyn Transform>>) -> Self {
        self.transforms.extend(transforms);
        self
    }

    pub fn progress_reporter(mut self, reporter: ProgressReporter) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    pub fn build(self) -> Result<Pipeline> {
        let input_plugin = self
            .input_plugin
            .ok_or_else(|| ConvertError::Pipeline("No input plugin specified".to_string()))?;
        let output_plugin = self
            .output_plugin
            .ok_or_else(|| ConvertError::Pipeline("No output plugin specified".to_string()))?;

        let mut pipeline = Pipeline::new(input_plugin, output_plugin);
        for t in self.transforms {
            pipeline.add_transform(t);
        }
        if let Some(reporter) = self.progress_reporter {
            pipeline.set_progress_reporter(reporter);
        }
        Ok(pipeline)
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
