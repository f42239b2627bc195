//! Drives the orchestrator against a live backend.
//!
//! Every fetch runs on its own task and reports back over one bounded
//! channel. Arrivals are applied one at a time, in the order they land, so
//! no state update is ever interleaved with another.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::api::Backend;
use crate::catalog::ReferenceDataLoader;
use crate::config::Config;
use crate::error::AnalysisError;
use crate::logging::{log, obj, v_str, Domain, Level};
use crate::model::Panel;
use crate::orchestrator::{
    AnalysisOrchestrator, Command, Disposition, DraftEdit, Event, Generation, SecondaryOutcome,
};
use crate::view::{project, Dashboard, ViewState};

pub type RenderFn = Box<dyn FnMut(&ViewState, &AnalysisOrchestrator) + Send>;
pub type NoticeFn = Box<dyn FnMut(&AnalysisError) + Send>;

pub struct Controller<B: Backend + 'static> {
    backend: Arc<B>,
    state: AnalysisOrchestrator,
    tx: mpsc::Sender<Event>,
    rx: mpsc::Receiver<Event>,
    outstanding: usize,
    renderers: Vec<RenderFn>,
    notices: Vec<NoticeFn>,
}

impl<B: Backend + 'static> Controller<B> {
    pub fn new(backend: Arc<B>, cfg: &Config) -> Self {
        let (tx, rx) = mpsc::channel(cfg.event_channel_capacity.max(1));
        Self {
            backend,
            state: AnalysisOrchestrator::new(),
            tx,
            rx,
            outstanding: 0,
            renderers: Vec::new(),
            notices: Vec::new(),
        }
    }

    /// Called with the fresh projection after every applied transition.
    pub fn on_render<F>(&mut self, f: F)
    where
        F: FnMut(&ViewState, &AnalysisOrchestrator) + Send + 'static,
    {
        self.renderers.push(Box::new(f));
    }

    /// Called for every user-facing notice.
    pub fn on_notice<F>(&mut self, f: F)
    where
        F: FnMut(&AnalysisError) + Send + 'static,
    {
        self.notices.push(Box::new(f));
    }

    pub fn state(&self) -> &AnalysisOrchestrator {
        &self.state
    }

    pub fn view(&self) -> ViewState {
        project(&self.state)
    }

    pub fn dashboard(&self) -> Dashboard {
        Dashboard::from_state(&self.state)
    }

    /// Fetches spawned but not yet applied or dropped.
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    pub async fn load_catalog(&mut self) -> Result<(), AnalysisError> {
        let outcome = ReferenceDataLoader::new(self.backend.as_ref()).load().await;
        let status = match &outcome {
            Ok(_) => Ok(()),
            Err(err) => Err(err.clone()),
        };
        self.dispatch(Event::CatalogArrived(outcome));
        status
    }

    pub fn edit(&mut self, edit: DraftEdit) {
        self.dispatch(Event::Edit(edit));
    }

    /// Must run inside a tokio runtime; the primary fetch is spawned.
    pub fn submit(&mut self) -> Result<Generation, AnalysisError> {
        let checked = self.state.draft().validate();
        self.dispatch(Event::Submit);
        match checked {
            Ok(_) => Ok(self.state.generation()),
            Err(err) => Err(err.into()),
        }
    }

    /// Apply the next response to land. `None` once nothing is outstanding.
    pub async fn next_arrival(&mut self) -> Option<Disposition> {
        if self.outstanding == 0 {
            return None;
        }
        let event = self.rx.recv().await?;
        self.outstanding -= 1;
        Some(self.dispatch(event))
    }

    /// Drain every outstanding fetch, including ones spawned along the way.
    pub async fn settle(&mut self) {
        while self.next_arrival().await.is_some() {}
    }

    fn dispatch(&mut self, event: Event) -> Disposition {
        let transition = self.state.apply(event);
        if transition.disposition == Disposition::Applied {
            self.render();
        }
        for command in transition.commands {
            self.execute(command);
        }
        transition.disposition
    }

    fn render(&mut self) {
        let view = project(&self.state);
        for render in &mut self.renderers {
            render(&view, &self.state);
        }
    }

    fn execute(&mut self, command: Command) {
        match command {
            Command::FetchPrimary { generation, request } => {
                let backend = Arc::clone(&self.backend);
                self.spawn_fetch(async move {
                    let outcome = backend.predict_viability(&request).await;
                    Event::PrimaryArrived { generation, outcome }
                });
            }
            Command::FetchSecondary { generation, panel, request } => {
                let backend = Arc::clone(&self.backend);
                self.spawn_fetch(async move {
                    let outcome = match panel {
                        Panel::Financial => SecondaryOutcome::Financial(backend.financial_projection(&request).await),
                        Panel::Competition => {
                            SecondaryOutcome::Competition(backend.competition_analysis(&request).await)
                        }
                        Panel::Ranking => SecondaryOutcome::Ranking(backend.area_heatmap(&request).await),
                    };
                    Event::SecondaryArrived { generation, outcome }
                });
            }
            Command::Notify(err) => {
                if let Some(message) = err.user_message() {
                    log(
                        Level::Warn,
                        Domain::View,
                        "notice",
                        obj(&[("msg", v_str(&message)), ("cause", v_str(&err.to_string()))]),
                    );
                }
                for notice in &mut self.notices {
                    notice(&err);
                }
            }
        }
    }

    fn spawn_fetch<F>(&mut self, fetch: F)
    where
        F: Future<Output = Event> + Send + 'static,
    {
        let tx = self.tx.clone();
        self.outstanding += 1;
        tokio::spawn(async move {
            let event = fetch.await;
            // Receiver lives as long as the controller; a failed send means it is gone.
            let _ = tx.send(event).await;
        });
    }
}
