//! Off-frame image loading on a worker thread.
//!
//! The frame loop submits `(RequestId, name, source)` jobs and polls for
//! results without blocking. Results carry the id they were submitted with;
//! deciding which one is current is the controller's job.

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

use particle_morph_core::{ImageLoadResult, MorphError, RequestId};

use crate::decode::{decode_image, read_image};

/// Where the encoded image comes from.
#[derive(Debug, Clone)]
pub enum LoadSource {
    Bytes(Vec<u8>),
    Path(PathBuf),
}

impl LoadSource {
    fn load(&self) -> ImageLoadResult {
        match self {
            LoadSource::Bytes(bytes) => decode_image(bytes),
            LoadSource::Path(path) => read_image(path),
        }
    }
}

struct Job {
    id: RequestId,
    name: String,
    source: LoadSource,
}

/// A finished load, ready for `MorphController::deliver`.
#[derive(Debug)]
pub struct LoadedImage {
    pub id: RequestId,
    pub name: String,
    pub result: ImageLoadResult,
}

pub struct ImageLoader {
    jobs: Option<Sender<Job>>,
    results: Receiver<LoadedImage>,
    worker: Option<JoinHandle<()>>,
}

impl ImageLoader {
    /// Starts the worker thread.
    pub fn spawn() -> Result<Self, MorphError> {
        let (job_tx, job_rx) = mpsc::channel::<Job>();
        let (result_tx, result_rx) = mpsc::channel::<LoadedImage>();
        let worker = thread::Builder::new()
            .name("image-loader".into())
            .spawn(move || {
                while let Ok(job) = job_rx.recv() {
                    log::debug!("decoding request {} ({})", job.id, job.name);
                    let loaded = LoadedImage {
                        id: job.id,
                        result: job.source.load(),
                        name: job.name,
                    };
                    if result_tx.send(loaded).is_err() {
                        break;
                    }
                }
            })
            .map_err(|e| MorphError::Io(format!("cannot start image loader: {e}")))?;
        Ok(Self {
            jobs: Some(job_tx),
            results: result_rx,
            worker: Some(worker),
        })
    }

    /// Queues a load. Fails only if the worker has gone away.
    pub fn submit(&self, id: RequestId, name: &str, source: LoadSource) -> Result<(), MorphError> {
        let job = Job {
            id,
            name: name.to_string(),
            source,
        };
        self.jobs
            .as_ref()
            .ok_or_else(worker_gone)?
            .send(job)
            .map_err(|_| worker_gone())
    }

    /// Returns a finished load if one is waiting.
    ///
    /// `Ok(None)` means nothing is ready yet. Fails with `MorphError::Io`
    /// once the worker has exited.
    pub fn try_recv(&self) -> Result<Option<LoadedImage>, MorphError> {
        match self.results.try_recv() {
            Ok(loaded) => Ok(Some(loaded)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(worker_gone()),
        }
    }
}

fn worker_gone() -> MorphError {
    log::error!("image loader thread exited");
    MorphError::Io("image loader stopped".into())
}

impl Drop for ImageLoader {
    fn drop(&mut self) {
        // Closing the job channel ends the worker loop.
        self.jobs.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("image loader thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::time::Duration;

    /// Polls the way a frame loop would, for up to five seconds.
    fn wait(loader: &ImageLoader) -> LoadedImage {
        for _ in 0..500 {
            if let Some(loaded) = loader.try_recv().unwrap() {
                return loaded;
            }
            thread::sleep(Duration::from_millis(10));
        }
        panic!("no result within five seconds");
    }

    fn png(w: u32, h: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(w, h, image::Rgba([10, 20, 30, 255]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn loads_bytes_off_thread() {
        let loader = ImageLoader::spawn().unwrap();
        loader.submit(1, "square", LoadSource::Bytes(png(5, 5))).unwrap();
        let loaded = wait(&loader);
        assert_eq!(loaded.id, 1);
        assert_eq!(loaded.name, "square");
        assert_eq!(loaded.result.unwrap().opaque_count(128), 25);
    }

    #[test]
    fn results_keep_their_request_ids_in_order() {
        let loader = ImageLoader::spawn().unwrap();
        loader.submit(3, "bad", LoadSource::Bytes(vec![1, 2, 3])).unwrap();
        loader.submit(4, "good", LoadSource::Bytes(png(2, 2))).unwrap();
        let first = wait(&loader);
        let second = wait(&loader);
        assert_eq!(first.id, 3);
        assert!(matches!(first.result, Err(MorphError::Decode(_))));
        assert_eq!(second.id, 4);
        assert!(second.result.is_ok());
    }

    #[test]
    fn loads_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.png");
        std::fs::write(&path, png(3, 1)).unwrap();
        let loader = ImageLoader::spawn().unwrap();
        loader.submit(9, "a.png", LoadSource::Path(path)).unwrap();
        let loaded = wait(&loader);
        assert_eq!(loaded.result.unwrap().width(), 3);
    }

    #[test]
    fn nothing_pending_means_no_result() {
        let loader = ImageLoader::spawn().unwrap();
        assert!(loader.try_recv().unwrap().is_none());
    }

    #[test]
    fn dead_worker_is_an_error_not_a_timeout() {
        let (result_tx, results) = mpsc::channel::<LoadedImage>();
        drop(result_tx);
        let loader = ImageLoader {
            jobs: None,
            results,
            worker: None,
        };
        assert!(matches!(loader.try_recv(), Err(MorphError::Io(_))));
        assert!(matches!(
            loader.submit(1, "x", LoadSource::Bytes(Vec::new())),
            Err(MorphError::Io(_))
        ));
    }
}
