//! Keeps a structure layout in sync with the selected project and the session.
//!
//! A background task watches two inputs (the selected project id and the current
//! [`Session`]) and publishes a [`StructureState`]. Every change of either input
//! supersedes an in-flight fetch; its response is discarded.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::ApiClient;
use crate::config::LayoutSection;
use crate::session::{Session, SessionProvider};

use super::builder::{Layout, LayoutBuilder};

/// What the structure view should show.
#[derive(Debug, Clone, Default)]
pub enum StructureState {
    /// No project selected
    #[default]
    NoSelection,
    /// A project is selected but nobody is signed in
    Unauthenticated,
    Loading,
    /// The fetch failed or the project has no indexed structure yet
    Empty,
    Ready(Arc<Layout>),
}

impl StructureState {
    pub fn is_loading(&self) -> bool {
        matches!(self, StructureState::Loading)
    }

    pub fn layout(&self) -> Option<&Arc<Layout>> {
        match self {
            StructureState::Ready(layout) => Some(layout),
            _ => None,
        }
    }

    /// Short status line for an empty view.
    pub fn describe(&self) -> &'static str {
        match self {
            StructureState::NoSelection => "No repository selected",
            StructureState::Unauthenticated => "Sign in to view the repository structure",
            StructureState::Loading => "Initializing topology map...",
            StructureState::Empty => "Empty or unindexed repository",
            StructureState::Ready(_) => "Architecture topology",
        }
    }
}

/// Handle to the background structure task. Dropping it stops the task.
pub struct StructureWatcher {
    selection: watch::Sender<Option<String>>,
    state: watch::Receiver<StructureState>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl StructureWatcher {
    /// Start watching. Must be called inside a tokio runtime.
    pub fn spawn(api: ApiClient, session: SessionProvider, layout: LayoutSection) -> Self {
        Self::spawn_with_builder(api, session, LayoutBuilder::new(layout))
    }

    pub fn spawn_with_builder(api: ApiClient, session: SessionProvider, builder: LayoutBuilder) -> Self {
        let (selection, selection_rx) = watch::channel(None);
        let (state_tx, state) = watch::channel(StructureState::NoSelection);
        let cancel = CancellationToken::new();

        let task = tokio::spawn(run(
            api,
            builder,
            selection_rx,
            session,
            state_tx,
            cancel.clone(),
        ));

        Self {
            selection,
            state,
            cancel,
            task: Some(task),
        }
    }

    /// Select a project, or clear the selection with `None`. Selecting the
    /// current project again does nothing.
    pub fn select(&self, project_id: Option<String>) {
        self.selection.send_if_modified(|current| {
            if *current == project_id {
                false
            } else {
                *current = project_id;
                true
            }
        });
    }

    /// Fetch the current project again.
    pub fn refresh(&self) {
        self.selection.send_modify(|_| {});
    }

    pub fn selected(&self) -> Option<String> {
        self.selection.borrow().clone()
    }

    pub fn state(&self) -> StructureState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<StructureState> {
        self.state.clone()
    }

    /// Wait until the latest fetch has finished and return the resulting state.
    pub async fn settled(&self) -> StructureState {
        let mut rx = self.state.clone();
        match rx.wait_for(|s| !s.is_loading()).await {
            Ok(state) => (*state).clone(),
            Err(_) => self.state(),
        }
    }

    /// Stop the background task and wait for it to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for StructureWatcher {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run(
    api: ApiClient,
    mut builder: LayoutBuilder,
    mut selection_rx: watch::Receiver<Option<String>>,
    session: SessionProvider,
    state_tx: watch::Sender<StructureState>,
    cancel: CancellationToken,
) {
    let mut session_rx = session.subscribe();

    loop {
        let project = selection_rx.borrow_and_update().clone();
        let current: Option<Session> = session_rx.borrow_and_update().clone();

        match (project, current) {
            (None, _) => {
                state_tx.send_replace(StructureState::NoSelection);
            }
            (Some(project_id), None) => {
                debug!(%project_id, "no session, clearing structure");
                state_tx.send_replace(StructureState::Unauthenticated);
            }
            (Some(project_id), Some(session)) => {
                state_tx.send_replace(StructureState::Loading);
                debug!(%project_id, "fetching structure");

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return,
                    changed = selection_rx.changed() => {
                        if changed.is_err() {
                            return;
                        }
                        debug!(%project_id, "selection changed, discarding fetch");
                        continue;
                    }
                    changed = session_rx.changed() => {
                        if changed.is_err() {
                            return;
                        }
                        debug!(%project_id, "session changed, discarding fetch");
                        continue;
                    }
                    result = api.fetch_structure(&project_id, Some(&session)) => {
                        let next = match result {
                            Ok(structure) if structure.nodes.is_empty() => StructureState::Empty,
                            Ok(structure) => match builder.build(&structure.nodes, &structure.links) {
                                Some(layout) => {
                                    debug!(%project_id, nodes = layout.len(), "structure ready");
                                    StructureState::Ready(Arc::new(layout))
                                }
                                None => StructureState::Empty,
                            },
                            Err(e) => {
                                warn!(%project_id, error = %e, "Failed to fetch repository structure");
                                StructureState::Empty
                            }
                        };
                        state_tx.send_replace(next);
                    }
                }
            }
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            changed = selection_rx.changed() => {
                if changed.is_err() {
                    return;
                }
            }
            changed = session_rx.changed() => {
                if changed.is_err() {
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn offline_api() -> ApiClient {
        ApiClient::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn test_no_selection_is_initial_state() {
        let watcher = StructureWatcher::spawn(
            offline_api(),
            SessionProvider::from_token(Some("tok".into())),
            LayoutSection::default(),
        );
        assert!(matches!(watcher.settled().await, StructureState::NoSelection));
        assert!(watcher.selected().is_none());
    }

    #[tokio::test]
    async fn test_selection_without_session_makes_no_request() {
        let watcher = StructureWatcher::spawn(
            offline_api(),
            SessionProvider::default(),
            LayoutSection::default(),
        );
        let mut rx = watcher.subscribe();
        watcher.select(Some("p1".into()));
        let state = rx
            .wait_for(|s| matches!(s, StructureState::Unauthenticated))
            .await
            .unwrap()
            .clone();
        assert!(state.layout().is_none());
    }

    #[tokio::test]
    async fn test_fetch_failure_is_empty() {
        let watcher = StructureWatcher::spawn(
            offline_api(),
            SessionProvider::from_token(Some("tok".into())),
            LayoutSection::default(),
        );
        let mut rx = watcher.subscribe();
        watcher.select(Some("p1".into()));
        rx.wait_for(|s| matches!(s, StructureState::Empty))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_clearing_selection_clears_state() {
        let watcher = StructureWatcher::spawn(
            offline_api(),
            SessionProvider::default(),
            LayoutSection::default(),
        );
        let mut rx = watcher.subscribe();
        watcher.select(Some("p1".into()));
        rx.wait_for(|s| matches!(s, StructureState::Unauthenticated))
            .await
            .unwrap();
        watcher.select(None);
        rx.wait_for(|s| matches!(s, StructureState::NoSelection))
            .await
            .unwrap();
    }

    #[test]
    fn test_describe() {
        assert_eq!(StructureState::Empty.describe(), "Empty or unindexed repository");
        assert!(StructureState::Loading.is_loading());
        assert!(!StructureState::NoSelection.is_loading());
    }
}
