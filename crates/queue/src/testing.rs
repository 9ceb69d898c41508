//! Scriptable in-memory endpoint shared by the queue tests.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use chunkwise_protocol::{FinalizeRequest, FinalizeResponse};
use tokio::sync::{Semaphore, mpsc};

use crate::endpoint::{ChunkRequest, UploadEndpoint};
use crate::error::TransportError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Chunk {
        upload_id: String,
        file_name: String,
        chunk_index: u64,
        total_chunks: u64,
        file_size: u64,
        data: Vec<u8>,
        checksum: Option<String>,
    },
    Finalize {
        upload_id: String,
        file_name: String,
    },
}

/// Holds chunk calls until the test hands out permits.
pub(crate) struct Gate {
    pub permits: Arc<Semaphore>,
    entered: mpsc::UnboundedSender<(String, u64)>,
}

/// Mock endpoint that records every call and fails on demand.
#[derive(Default)]
pub(crate) struct MockEndpoint {
    calls: Mutex<Vec<Call>>,
    chunk_failures: Mutex<Vec<(String, u64, TransportError)>>,
    finalize_failures: Mutex<Vec<(String, TransportError)>>,
    panics: Mutex<Vec<String>>,
    gate: Option<Gate>,
}

impl MockEndpoint {
    pub fn new() -> Self {
        Self::default()
    }

    /// An endpoint whose chunk calls block until a permit is added.
    ///
    /// The receiver yields `(file_name, chunk_index)` as each call arrives.
    pub fn gated() -> (Self, Arc<Semaphore>, mpsc::UnboundedReceiver<(String, u64)>) {
        let permits = Arc::new(Semaphore::new(0));
        let (entered, rx) = mpsc::unbounded_channel();
        let endpoint = Self {
            gate: Some(Gate {
                permits: Arc::clone(&permits),
                entered,
            }),
            ..Self::default()
        };
        (endpoint, permits, rx)
    }

    /// Fails the next call for chunk `index` of `file_name`.
    pub fn fail_chunk_once(&self, file_name: &str, index: u64, err: TransportError) {
        self.chunk_failures
            .lock()
            .unwrap()
            .push((file_name.to_string(), index, err));
    }

    /// Fails the next finalize call for `file_name`.
    pub fn fail_finalize_once(&self, file_name: &str, err: TransportError) {
        self.finalize_failures
            .lock()
            .unwrap()
            .push((file_name.to_string(), err));
    }

    /// Panics on every chunk call for `file_name`.
    pub fn panic_on(&self, file_name: &str) {
        self.panics.lock().unwrap().push(file_name.to_string());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Chunk indices sent for `file_name`, in call order.
    pub fn chunk_indices(&self, file_name: &str) -> Vec<u64> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Chunk {
                    file_name: name,
                    chunk_index,
                    ..
                } if name == file_name => Some(chunk_index),
                _ => None,
            })
            .collect()
    }

    /// Finalize calls issued for `file_name`.
    pub fn finalize_count(&self, file_name: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::Finalize { file_name: name, .. } if name == file_name))
            .count()
    }

    /// Distinct upload ids used for `file_name`, in first-use order.
    pub fn upload_ids(&self, file_name: &str) -> Vec<String> {
        let mut ids = Vec::new();
        for call in self.calls() {
            let (id, name) = match call {
                Call::Chunk {
                    upload_id,
                    file_name,
                    ..
                }
                | Call::Finalize {
                    upload_id,
                    file_name,
                } => (upload_id, file_name),
            };
            if name == file_name && !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }
}

impl UploadEndpoint for MockEndpoint {
    fn send_chunk(
        &self,
        request: ChunkRequest,
    ) -> Pin<Box<dyn Future<Output = Result<(), TransportError>> + Send + '_>> {
        Box::pin(async move {
            let meta = request.metadata;
            let explode = self.panics.lock().unwrap().contains(&meta.file_name);
            if explode {
                panic!("endpoint exploded on {}", meta.file_name);
            }
            if let Some(gate) = &self.gate {
                let _ = gate.entered.send((meta.file_name.clone(), meta.chunk_index));
                gate.permits
                    .acquire()
                    .await
                    .expect("gate semaphore closed")
                    .forget();
            }

            self.calls.lock().unwrap().push(Call::Chunk {
                upload_id: meta.upload_id.clone(),
                file_name: meta.file_name.clone(),
                chunk_index: meta.chunk_index,
                total_chunks: meta.total_chunks,
                file_size: meta.file_size,
                data: request.data.to_vec(),
                checksum: request.checksum,
            });

            let mut failures = self.chunk_failures.lock().unwrap();
            match failures
                .iter()
                .position(|(name, index, _)| *name == meta.file_name && *index == meta.chunk_index)
            {
                Some(pos) => Err(failures.remove(pos).2),
                None => Ok(()),
            }
        })
    }

    fn finalize(
        &self,
        request: FinalizeRequest,
    ) -> Pin<Box<dyn Future<Output = Result<FinalizeResponse, TransportError>> + Send + '_>> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(Call::Finalize {
                upload_id: request.upload_id.clone(),
                file_name: request.file_name.clone(),
            });

            let mut failures = self.finalize_failures.lock().unwrap();
            if let Some(pos) = failures
                .iter()
                .position(|(name, _)| *name == request.file_name)
            {
                return Err(failures.remove(pos).1);
            }

            Ok(FinalizeResponse {
                url: format!(
                    "https://files.example/{}/{}",
                    request.upload_id, request.file_name
                ),
            })
        })
    }
}

/// A file of `size` bytes with a repeating byte pattern.
pub(crate) fn sized_file(name: &str, size: usize) -> chunkwise_transfer::UploadFile {
    let data: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
    chunkwise_transfer::UploadFile::from_name(name, data)
}
