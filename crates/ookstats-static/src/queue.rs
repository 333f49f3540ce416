//! A pool of writer tasks draining pages from a bounded queue.

use std::{path::PathBuf, sync::Arc};

use tokio::{
  sync::{Mutex, mpsc},
  task::JoinSet,
};

use crate::{
  Error, Result,
  pages::Page,
  writer::{self, Format},
};

#[derive(Debug)]
struct PageJob {
  path: PathBuf,
  page: Page,
}

pub struct PageQueue {
  tx:      mpsc::Sender<PageJob>,
  workers: JoinSet<Result<usize>>,
}

impl PageQueue {
  pub fn start(workers: usize) -> Self {
    let workers = workers.max(1);
    let (tx, rx) = mpsc::channel::<PageJob>(workers * 4);
    let rx = Arc::new(Mutex::new(rx));

    let mut set: JoinSet<Result<usize>> = JoinSet::new();
    for _ in 0..workers {
      let rx = Arc::clone(&rx);
      set.spawn(async move {
        let mut written = 0usize;
        loop {
          let job = rx.lock().await.recv().await;
          let Some(PageJob { path, page }) = job else {
            break;
          };
          let format = match page {
            Page::Search(_) => Format::Compact,
            _ => Format::Pretty,
          };
          tokio::task::spawn_blocking(move || writer::write_json(&path, &page, format)).await??;
          written += 1;
        }
        Ok::<_, Error>(written)
      });
    }
    Self { tx, workers: set }
  }

  /// Queue `page` for `path`, waiting while the queue is full.
  pub async fn send(&self, path: PathBuf, page: Page) -> Result<()> {
    self
      .tx
      .send(PageJob { path, page })
      .await
      .map_err(|_| Error::QueueClosed)
  }

  /// Close the queue, wait for the workers and return the pages written.
  ///
  /// The first worker failure is returned once every worker has stopped.
  pub async fn finish(self) -> Result<usize> {
    let Self { tx, mut workers } = self;
    drop(tx);

    let mut written = 0;
    let mut failure = None;
    while let Some(joined) = workers.join_next().await {
      match joined.map_err(Error::from).and_then(|r| r) {
        Ok(n) => written += n,
        Err(e) => {
          tracing::error!(error = %e, "page writer stopped");
          failure.get_or_insert(e);
        }
      }
    }
    match failure {
      Some(e) => Err(e),
      None => Ok(written),
    }
  }
}
