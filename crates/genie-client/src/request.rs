//! Task requests and the payload sent to the API.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::{CalcMode, Credentials, GenieConfig, TaskMode};

/// Resources requested for the remote worker running a task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClusterArgs {
    /// Accelerator type, such as a GPU model.
    pub accelerators: Option<String>,
    /// Number of CPUs.
    pub n_cpu: Option<u32>,
    /// Whether spot instances may be used.
    pub use_spot: Option<bool>,
}

impl ClusterArgs {
    /// Requests an accelerator.
    #[must_use]
    pub fn with_accelerators(mut self, accelerators: impl Into<String>) -> Self {
        self.accelerators = Some(accelerators.into());
        self
    }

    /// Requests a CPU count.
    #[must_use]
    pub fn with_n_cpu(mut self, n_cpu: u32) -> Self {
        self.n_cpu = Some(n_cpu);
        self
    }

    /// Allows or forbids spot instances.
    #[must_use]
    pub fn with_use_spot(mut self, use_spot: bool) -> Self {
        self.use_spot = Some(use_spot);
        self
    }
}

/// Filters for [`TaskRequest::list_corresponding_files`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorrespondingFiles {
    /// Target data type, such as `semi-structured`.
    pub data_type: Option<String>,
    /// Target variable description, such as `text-blocks`.
    pub variable_desc: Option<String>,
    /// Target source, such as `layout-genie`.
    pub source: Option<String>,
    /// Target page number.
    pub pagenum: Option<String>,
    /// Target file format, such as `csv`.
    pub file_format: Option<String>,
}

/// One remote function call: its name, arguments and cluster settings.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRequest {
    func: String,
    args: Map<String, Value>,
    cluster: ClusterArgs,
}

impl TaskRequest {
    /// Creates a request for `func` without arguments.
    pub fn new(func: impl Into<String>) -> Self {
        Self {
            func: func.into(),
            args: Map::new(),
            cluster: ClusterArgs::default(),
        }
    }

    /// Adds an argument.
    #[must_use]
    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }

    /// Replaces all arguments.
    #[must_use]
    pub fn with_args(mut self, args: Map<String, Value>) -> Self {
        self.args = args;
        self
    }

    /// Sets the cluster settings.
    #[must_use]
    pub fn with_cluster(mut self, cluster: ClusterArgs) -> Self {
        self.cluster = cluster;
        self
    }

    /// Returns the remote function name.
    pub fn func(&self) -> &str {
        &self.func
    }

    /// Returns the arguments.
    pub fn args(&self) -> &Map<String, Value> {
        &self.args
    }

    /// Returns the cluster settings.
    pub fn cluster(&self) -> &ClusterArgs {
        &self.cluster
    }

    /// Checks whether a file exists in remote storage.
    pub fn check_file_exists(file: impl Into<String>) -> Self {
        Self::new("check_file_exists").with_arg("file", file.into())
    }

    /// Reads a file from remote storage.
    pub fn read_file(file: impl Into<String>) -> Self {
        Self::new("read_file")
            .with_arg("file", file.into())
            .with_arg("add_file", Value::Null)
    }

    /// Lists the files of a document matching a glob pattern.
    pub fn list_doc_files(doc_name: impl Into<String>, file_pattern: impl Into<String>) -> Self {
        Self::new("list_doc_files")
            .with_arg("doc_name", doc_name.into())
            .with_arg("file_pattern", file_pattern.into())
    }

    /// Maps input files to the files derived from them.
    pub fn list_corresponding_files(files: &[String], filters: CorrespondingFiles) -> Self {
        Self::new("list_corresponding_files")
            .with_arg("files", files)
            .with_arg("data_type", filters.data_type)
            .with_arg("variable_desc", filters.variable_desc)
            .with_arg("source", filters.source)
            .with_arg("file_format", filters.file_format)
            .with_arg("pagenum", filters.pagenum)
    }

    /// Uploads file contents under the given names.
    pub fn upload_data(contents: &[String], filenames: &[String], username: impl Into<String>) -> Self {
        Self::new("upload_data")
            .with_arg("contents", contents)
            .with_arg("filenames", filenames)
            .with_arg("username", username.into())
    }

    /// Extracts text from page images; `file_pattern` defaults to `*.png`.
    pub fn extract_text(doc_name: impl Into<String>, file_pattern: Option<&str>) -> Self {
        Self::new("extract_text")
            .with_arg("doc_name", doc_name.into())
            .with_arg("file_pattern", file_pattern.unwrap_or("*.png"))
    }

    /// Segments extracted text blocks; `file_pattern` defaults to the
    /// text-block CSV files.
    pub fn segment_text(doc_name: impl Into<String>, file_pattern: Option<&str>) -> Self {
        Self::new("segment_text")
            .with_arg("doc_name", doc_name.into())
            .with_arg(
                "file_pattern",
                file_pattern.unwrap_or("variable_desc=text-blocks/**.csv"),
            )
    }

    /// Converts a PDF document to markdown.
    pub fn convert_pdf_to_markdown(doc_name: impl Into<String>) -> Self {
        Self::new("convert_pdf_to_markdown").with_arg("doc_name", doc_name.into())
    }

    /// Ranks the pages of a document by relevance to keyphrases.
    pub fn filter_pages_pipeline(
        doc_name: impl Into<String>,
        keyphrases: &[String],
        page_rank_max: Option<u32>,
    ) -> Self {
        Self::new("filter_pages_pipeline")
            .with_arg("doc_name", doc_name.into())
            .with_arg("keyphrases", keyphrases)
            .with_arg("page_rank_max", page_rank_max)
    }

    /// Extracts and structures quantitative data from a document.
    pub fn structure_quants_pipeline(doc_name: impl Into<String>) -> Self {
        Self::new("structure_quants_pipeline").with_arg("doc_name", doc_name.into())
    }

    /// Converts text to a slug.
    pub fn slugify(text: impl Into<String>) -> Self {
        Self::new("slugify").with_arg("text", text.into())
    }
}

/// Request body accepted by the API.
#[derive(Debug, Serialize)]
pub struct ApiPayload<'a> {
    api_key: &'a str,
    tasks: Tasks<'a>,
}

#[derive(Debug, Serialize)]
struct Tasks<'a> {
    task_1: TaskSpec<'a>,
}

#[derive(Debug, Serialize)]
struct TaskSpec<'a> {
    func: &'a str,
    args: &'a Map<String, Value>,
    overwrite: u8,
    overwrite_base_output: u8,
    return_data: u8,
    verbose: u8,
    task_mode: TaskMode,
    calc_mode: CalcMode,
    accelerators: Option<&'a str>,
    n_cpu: Option<u32>,
    use_spot: Option<bool>,
}

impl<'a> ApiPayload<'a> {
    /// Wraps a request in the single-task envelope, taking the task flags
    /// from `config` and the mode from `task_mode`.
    pub fn new(
        request: &'a TaskRequest,
        config: &GenieConfig,
        credentials: &'a Credentials,
        task_mode: TaskMode,
    ) -> Self {
        Self {
            api_key: credentials.api_key(),
            tasks: Tasks {
                task_1: TaskSpec {
                    func: &request.func,
                    args: &request.args,
                    overwrite: config.overwrite.into(),
                    overwrite_base_output: config.overwrite_base_output.into(),
                    return_data: config.return_data.into(),
                    verbose: config.verbose.into(),
                    task_mode,
                    calc_mode: config.calc_mode,
                    accelerators: request.cluster.accelerators.as_deref(),
                    n_cpu: request.cluster.n_cpu,
                    use_spot: request.cluster.use_spot,
                },
            },
        }
    }
}
