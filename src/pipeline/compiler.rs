// src/pipeline/compiler.rs

//! Turns a validated job into its task graph.
//!
//! Arena order (and therefore parent-before-child order):
//! 1. `ids-extractor`
//! 2. one `practices-extractor` per practice
//! 3. per product type: its `data-extractor` batches, then its `files-merge`
//! 4. one `time-series-analysis` per practice
//! 5. the terminal `product-formatter`

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::catalog::{JobScope, ValidatedInputs};
use crate::config::SiteConfig;
use crate::errors::Result;
use crate::pipeline::arguments::{
    self, AnalysisInputs, FormatterInputs, CLEANUP_CMD, DATA_EXTRACTOR_CMD, FILES_MERGE_CMD,
    IDS_EXTRACTOR_CMD, PRACTICES_EXTRACTOR_CMD, PRODUCT_FORMATTER_CMD,
    TIME_SERIES_ANALYSIS_CMD,
};
use crate::pipeline::batch::partition;
use crate::pipeline::execution::{GlobalExecutionInfo, PracticeOutput, ProductFormatterParams};
use crate::pipeline::graph::{TaskGraph, TaskKind};
use crate::pipeline::layout::{self, WorkingDirs, IDS_FILE_NAME};
use crate::types::{Practice, ProductType, TaskId};

/// A task together with the file or directory it produces.
#[derive(Debug, Clone)]
struct Produced {
    task: TaskId,
    output: PathBuf,
}

struct Compiler<'a> {
    scope: &'a JobScope,
    site: &'a SiteConfig,
    dirs: &'a WorkingDirs,
    graph: TaskGraph,
}

/// Compile the full task graph of one job.
pub fn compile(
    scope: &JobScope,
    site: &SiteConfig,
    inputs: &ValidatedInputs,
    dirs: &WorkingDirs,
) -> Result<GlobalExecutionInfo> {
    let mut c = Compiler {
        scope,
        site,
        dirs,
        graph: TaskGraph::new(),
    };

    let ids = c.ids_extractor()?;

    let mut tables = BTreeMap::new();
    for practice in inputs.practices().iter().copied() {
        tables.insert(practice, c.practices_extractor(&ids, practice)?);
    }

    let mut merged = BTreeMap::new();
    for product_type in inputs.product_types().iter().copied() {
        let products = inputs.products().get(product_type);
        let batches = c.data_extraction(&ids, product_type, products)?;
        merged.insert(product_type, c.files_merge(product_type, &batches)?);
    }

    let mut analyses = Vec::new();
    for practice in inputs.practices().iter().copied() {
        let analysis = c.time_series_analysis(practice, tables.get(&practice), &merged)?;
        analyses.push(PracticeOutput {
            practice,
            task: analysis.task,
            output_dir: analysis.output,
        });
    }

    let formatter = c.product_formatter(analyses)?;
    c.graph.validate_acyclic()?;

    info!(
        job_id = %scope.job_id,
        tasks = c.graph.len(),
        steps = c.graph.steps().len(),
        practices = inputs.practices().len(),
        "task graph compiled"
    );

    Ok(GlobalExecutionInfo {
        scope: scope.clone(),
        graph: c.graph,
        formatter,
        practices: inputs.practices().to_vec(),
        inputs: inputs.products().clone(),
    })
}

impl Compiler<'_> {
    fn add(&mut self, kind: TaskKind, parents: Vec<TaskId>) -> Result<(TaskId, PathBuf)> {
        let task = self.graph.add_task(kind, parents)?;
        let dir = self.dirs.task_dir(self.scope.job_id, task, &kind);
        debug!(job_id = %self.scope.job_id, %task, kind = %kind, "compiled task");
        Ok((task, dir))
    }

    fn ids_extractor(&mut self) -> Result<Produced> {
        let (task, dir) = self.add(TaskKind::IdsExtractor, Vec::new())?;
        let out_file = dir.join(IDS_FILE_NAME);
        self.graph.add_step(
            task,
            IDS_EXTRACTOR_CMD,
            arguments::ids_extractor_args(self.site, &out_file),
        )?;
        Ok(Produced {
            task,
            output: out_file,
        })
    }

    fn practices_extractor(&mut self, ids: &Produced, practice: Practice) -> Result<Produced> {
        let (task, dir) = self.add(TaskKind::PracticesExtractor { practice }, vec![ids.task])?;
        let out_file = dir.join(layout::practice_table_file_name(self.site, practice));
        self.graph.add_step(
            task,
            PRACTICES_EXTRACTOR_CMD,
            arguments::practices_extraction_args(self.site, practice, &ids.output, &out_file),
        )?;
        Ok(Produced {
            task,
            output: out_file,
        })
    }

    /// One extraction task per batch; each writes to its own directory.
    fn data_extraction(
        &mut self,
        ids: &Produced,
        product_type: ProductType,
        products: &[String],
    ) -> Result<Vec<Produced>> {
        let batches = partition(products, self.site.prds_per_group())?;
        debug!(
            %product_type,
            products = products.len(),
            batches = batches.len(),
            "partitioned products"
        );

        let mut produced = Vec::with_capacity(batches.len());
        for (batch, files) in batches.into_iter().enumerate() {
            let (task, dir) = self.add(
                TaskKind::DataExtractor {
                    product_type,
                    batch,
                },
                vec![ids.task],
            )?;
            self.graph.add_step(
                task,
                DATA_EXTRACTOR_CMD,
                arguments::data_extraction_args(self.site, product_type, &ids.output, files, &dir),
            )?;
            produced.push(Produced { task, output: dir });
        }
        Ok(produced)
    }

    /// Fan-in of all batches of one product type.
    fn files_merge(&mut self, product_type: ProductType, batches: &[Produced]) -> Result<Produced> {
        let parents = batches.iter().map(|b| b.task).collect();
        let (task, dir) = self.add(TaskKind::FilesMerge { product_type }, parents)?;
        let out_file = dir.join(layout::merged_file_name(self.site, product_type));
        let batch_dirs: Vec<PathBuf> = batches.iter().map(|b| b.output.clone()).collect();

        self.graph.add_step(
            task,
            FILES_MERGE_CMD,
            arguments::files_merge_args(&batch_dirs, &out_file),
        )?;
        if self.site.remove_intermediates() {
            self.graph
                .add_step(task, CLEANUP_CMD, arguments::cleanup_args(&batch_dirs))?;
        }

        Ok(Produced {
            task,
            output: out_file,
        })
    }

    fn time_series_analysis(
        &mut self,
        practice: Practice,
        table: Option<&Produced>,
        merged: &BTreeMap<ProductType, Produced>,
    ) -> Result<Produced> {
        let site = self.site;
        let input = |t: ProductType| {
            merged
                .get(&t)
                .filter(|_| site.practice(practice).is_some_and(|cfg| cfg.requires(t)))
        };

        let mut parents: Vec<TaskId> = ProductType::ALL
            .iter()
            .filter_map(|t| input(*t).map(|m| m.task))
            .collect();
        if let Some(table) = table {
            parents.push(table.task);
        }
        parents.sort();

        let analysis_inputs = AnalysisInputs {
            practice_table: table.map(|t| t.output.as_path()),
            ndvi: input(ProductType::Ndvi).map(|m| m.output.as_path()),
            amp: input(ProductType::Amplitude).map(|m| m.output.as_path()),
            cohe: input(ProductType::Coherence).map(|m| m.output.as_path()),
        };

        let (task, dir) = self.add(TaskKind::TimeSeriesAnalysis { practice }, parents)?;
        let args = arguments::time_series_analysis_args(site, practice, &analysis_inputs, &dir);
        self.graph.add_step(task, TIME_SERIES_ANALYSIS_CMD, args)?;

        Ok(Produced { task, output: dir })
    }

    fn product_formatter(&mut self, analyses: Vec<PracticeOutput>) -> Result<ProductFormatterParams> {
        let parents: Vec<TaskId> = analyses.iter().map(|a| a.task).collect();
        let (task, _dir) = self.add(TaskKind::ProductFormatter, parents.clone())?;

        let destination = self.dirs.product_dir(self.scope.job_id);
        let manifest_path = self.dirs.manifest_path(self.scope.job_id);
        let outputs: Vec<PathBuf> = analyses.iter().map(|a| a.output_dir.clone()).collect();

        let args = arguments::product_formatter_args(&FormatterInputs {
            site_id: self.scope.site_id,
            tile_id: self.site.tile_id(),
            destination: &destination,
            manifest_path: &manifest_path,
            start: self.scope.start,
            end: self.scope.end,
            analysis_outputs: &outputs,
        });
        self.graph.add_step(task, PRODUCT_FORMATTER_CMD, args)?;

        Ok(ProductFormatterParams {
            task,
            parents,
            analysis_outputs: analyses,
            tile_id: self.site.tile_id().to_string(),
            destination,
            manifest_path,
        })
    }
}
