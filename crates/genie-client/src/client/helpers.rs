//! Typed wrappers around the remote functions used by document pipelines.

use genie_core::Result;

use super::GenieClient;
use crate::{ClusterArgs, CorrespondingFiles, TaskRequest, TaskResponse};

impl GenieClient {
    /// Checks whether a file exists in remote storage.
    pub async fn check_file_exists(&self, file: &str) -> Result<TaskResponse> {
        self.execute(&TaskRequest::check_file_exists(file)).await
    }

    /// Reads a file from remote storage.
    pub async fn read_file(&self, file: &str) -> Result<TaskResponse> {
        self.execute(&TaskRequest::read_file(file)).await
    }

    /// Lists the files of a document matching a glob pattern.
    pub async fn list_doc_files(&self, doc_name: &str, file_pattern: &str) -> Result<TaskResponse> {
        self.execute(&TaskRequest::list_doc_files(doc_name, file_pattern))
            .await
    }

    /// Maps input files to the files derived from them.
    pub async fn list_corresponding_files(
        &self,
        files: &[String],
        filters: CorrespondingFiles,
    ) -> Result<TaskResponse> {
        self.execute(&TaskRequest::list_corresponding_files(files, filters))
            .await
    }

    /// Uploads file contents. Without `username` the configured one is used.
    pub async fn upload_data(
        &self,
        contents: &[String],
        filenames: &[String],
        username: Option<&str>,
    ) -> Result<TaskResponse> {
        let username = username.unwrap_or_else(|| self.credentials().username());
        self.execute(&TaskRequest::upload_data(contents, filenames, username))
            .await
    }

    /// Extracts text from the page images of a document.
    pub async fn extract_text(&self, doc_name: &str, file_pattern: Option<&str>) -> Result<TaskResponse> {
        self.execute(&TaskRequest::extract_text(doc_name, file_pattern))
            .await
    }

    /// Segments the extracted text blocks of a document.
    pub async fn segment_text(&self, doc_name: &str, file_pattern: Option<&str>) -> Result<TaskResponse> {
        self.execute(&TaskRequest::segment_text(doc_name, file_pattern))
            .await
    }

    /// Converts a PDF document to markdown, optionally on a specific cluster.
    pub async fn convert_pdf_to_markdown(
        &self,
        doc_name: &str,
        cluster: Option<ClusterArgs>,
    ) -> Result<TaskResponse> {
        let request = TaskRequest::convert_pdf_to_markdown(doc_name)
            .with_cluster(cluster.unwrap_or_default());
        self.execute(&request).await
    }

    /// Ranks the pages of a document by relevance to keyphrases.
    pub async fn filter_pages_pipeline(
        &self,
        doc_name: &str,
        keyphrases: &[String],
        page_rank_max: Option<u32>,
    ) -> Result<TaskResponse> {
        self.execute(&TaskRequest::filter_pages_pipeline(
            doc_name,
            keyphrases,
            page_rank_max,
        ))
        .await
    }

    /// Extracts and structures quantitative data from a document.
    pub async fn structure_quants_pipeline(&self, doc_name: &str) -> Result<TaskResponse> {
        self.execute(&TaskRequest::structure_quants_pipeline(doc_name))
            .await
    }

    /// Converts text to a slug.
    pub async fn slugify(&self, text: &str) -> Result<TaskResponse> {
        self.execute(&TaskRequest::slugify(text)).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::TaskMode;
    use crate::testing::FakeApi;

    #[tokio::test]
    async fn test_upload_defaults_to_configured_username() {
        let api = FakeApi::start().await;
        let client = api.client(TaskMode::Sync);

        // The fake rejects upload_data; only the payload matters here.
        let _ = client
            .upload_data(&["a,b".to_string()], &["a.csv".to_string()], None)
            .await;

        let args = &api.payloads()[0]["tasks"]["task_1"]["args"];
        assert_eq!(args["username"], json!("tester"));
        assert_eq!(args["filenames"], json!(["a.csv"]));
    }

    #[tokio::test]
    async fn test_list_doc_files() {
        let api = FakeApi::start().await;
        api.put_file("gs://db-genie/entity=acme/pagenum=1.csv", json!([]));
        api.put_file("gs://db-genie/entity=globex/pagenum=1.csv", json!([]));
        let client = api.client(TaskMode::Sync);

        let response = client.list_doc_files("acme", "**.csv").await.unwrap();

        assert_eq!(
            response.data(),
            Some(&json!(["gs://db-genie/entity=acme/pagenum=1.csv"]))
        );
    }

    #[tokio::test]
    async fn test_sync_job_returns_data() {
        let api = FakeApi::start().await;
        let client = api.client(TaskMode::Sync);

        let response = client.extract_text("acme", None).await.unwrap();

        assert!(!response.is_scheduled());
        assert_eq!(response.data(), Some(&json!([])));
        let args = &api.payloads()[0]["tasks"]["task_1"]["args"];
        assert_eq!(args["file_pattern"], json!("*.png"));
    }

    #[tokio::test]
    async fn test_convert_pdf_to_markdown_sends_cluster() {
        let api = FakeApi::start().await;
        let client = api.client(TaskMode::Async);

        let response = client
            .convert_pdf_to_markdown(
                "acme",
                Some(crate::ClusterArgs::default().with_accelerators("L4")),
            )
            .await
            .unwrap();

        assert!(response.is_scheduled());
        assert_eq!(
            api.payloads()[0]["tasks"]["task_1"]["accelerators"],
            json!("L4")
        );
    }
}
