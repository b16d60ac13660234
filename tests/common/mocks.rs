use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use video_predict::{
    Result,
    runner::{ModelRunner, ProcessOutput},
    storage::{Storage, StorageError, StorageResult},
};

/// One `store` call: destination and the relative files with their contents.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredUpload {
    pub uri: String,
    pub files: Vec<(String, Vec<u8>)>,
}

/// Mock storage backed by a map of `uri -> bytes`
#[derive(Debug, Default)]
pub struct MockStorage {
    pub objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    pub fetches: Arc<Mutex<Vec<String>>>,
    pub stores: Arc<Mutex<Vec<StoredUpload>>>,
    pub store_error: Option<String>,
}

impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(self, uri: &str, data: &[u8]) -> Self {
        self.objects
            .lock()
            .unwrap()
            .insert(uri.to_string(), data.to_vec());
        self
    }

    pub fn with_store_error(mut self, error: &str) -> Self {
        self.store_error = Some(error.to_string());
        self
    }

    pub fn fetch_calls(&self) -> Vec<String> {
        self.fetches.lock().unwrap().clone()
    }

    pub fn store_calls(&self) -> Vec<StoredUpload> {
        self.stores.lock().unwrap().clone()
    }
}

#[async_trait]
impl Storage for MockStorage {
    async fn fetch(&self, uri: &str, local_path: &Path) -> StorageResult<PathBuf> {
        self.fetches.lock().unwrap().push(uri.to_string());

        let data = self
            .objects
            .lock()
            .unwrap()
            .get(uri)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(uri.to_string()))?;

        if let Some(parent) = local_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(local_path, data)?;
        Ok(local_path.to_path_buf())
    }

    async fn store(&self, local_dir: &Path, uri: &str) -> StorageResult<usize> {
        let mut files = Vec::new();
        collect(local_dir, local_dir, &mut files)?;
        files.sort();
        let count = files.len();

        self.stores.lock().unwrap().push(StoredUpload {
            uri: uri.to_string(),
            files,
        });

        match &self.store_error {
            Some(error) => Err(StorageError::UploadFailed(error.clone())),
            None => Ok(count),
        }
    }
}

fn collect(root: &Path, dir: &Path, out: &mut Vec<(String, Vec<u8>)>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect(root, &path, out)?;
        } else {
            let relative = path
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/");
            out.push((relative, std::fs::read(&path)?));
        }
    }
    Ok(())
}

/// What the mock runner saw for one invocation.
#[derive(Debug, Clone)]
pub struct RunnerCall {
    pub input_file: PathBuf,
    pub output_dir: PathBuf,
    pub input_contents: Vec<u8>,
}

/// Mock processing step that writes fixed files and exits with a fixed code
#[derive(Debug)]
pub struct MockRunner {
    pub exit_code: i32,
    pub stderr: String,
    pub outputs: Vec<(String, String)>,
    pub calls: Arc<Mutex<Vec<RunnerCall>>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self {
            exit_code: 0,
            stderr: String::new(),
            outputs: vec![(
                "simulated_output.txt".to_string(),
                "Simulated output".to_string(),
            )],
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(exit_code: i32, stderr: &str) -> Self {
        Self {
            exit_code,
            stderr: stderr.to_string(),
            outputs: Vec::new(),
            ..Self::new()
        }
    }

    pub fn get_calls(&self) -> Vec<RunnerCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelRunner for MockRunner {
    async fn run(&self, input_file: &Path, output_dir: &Path) -> Result<ProcessOutput> {
        self.calls.lock().unwrap().push(RunnerCall {
            input_file: input_file.to_path_buf(),
            output_dir: output_dir.to_path_buf(),
            input_contents: std::fs::read(input_file).unwrap_or_default(),
        });

        for (name, content) in &self.outputs {
            std::fs::write(output_dir.join(name), content)?;
        }

        Ok(ProcessOutput {
            exit_code: Some(self.exit_code),
            stdout: "mock run complete\n".to_string(),
            stderr: self.stderr.clone(),
        })
    }

    fn is_available(&self) -> bool {
        true
    }
}
