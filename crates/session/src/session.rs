//! Session object owning the bridge, the scene and the controller

use crate::graph::{graph_elements, InlineError};
use crate::intent::IntentClient;
use crate::Result;
use mathboard_config::{ConfigValidator, MathboardConfig};
use mathboard_rpc::{BridgeConfig, HostFactory, MathClient, RpcBridge};
use mathboard_scene::{
    BoundingBox, DrawingBackend, InteractionConfig, InteractionController, ReconcileReport,
    Reconciler, SceneError, SceneModel, SceneMutation, Viewport,
};
use mathboard_shared::events::WindowEvent;
use mathboard_shared::{Command, CommandResult, Element, ElementId, WorkerStatus};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Runtime settings of one session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub bridge: BridgeConfig,
    pub interaction: InteractionConfig,
    pub viewport: Viewport,
    pub intent_endpoint: String,
    pub intent_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            bridge: BridgeConfig::default(),
            interaction: InteractionConfig::default(),
            viewport: Viewport::default(),
            intent_endpoint: "http://localhost:8000".to_string(),
            intent_timeout: Duration::from_secs(60),
        }
    }
}

impl SessionConfig {
    /// HTTP client for the configured intent service
    pub fn intent_client(&self) -> Result<IntentClient> {
        IntentClient::new(self.intent_endpoint.as_str(), self.intent_timeout)
    }
}

impl From<&MathboardConfig> for SessionConfig {
    fn from(config: &MathboardConfig) -> Self {
        Self {
            bridge: BridgeConfig {
                request_timeout: Duration::from_millis(config.bridge.request_timeout_ms),
                reject_on_restart: config.bridge.reject_on_restart,
            },
            interaction: InteractionConfig {
                zoom_factor: config.interaction.zoom_factor,
                min_scale: config.interaction.min_scale,
                max_scale: config.interaction.max_scale,
                hit_threshold_divisor: config.interaction.hit_threshold_divisor,
            },
            viewport: Viewport::new(
                BoundingBox::from_array(config.viewport.bounding_box),
                config.viewport.width,
                config.viewport.height,
            ),
            intent_endpoint: config.intent.endpoint.clone(),
            intent_timeout: Duration::from_millis(config.intent.timeout_ms),
        }
    }
}

/// One interactive diagram and the computation host serving it.
///
/// Everything except the bridge lives on the caller's task; the bridge may
/// be shared through [`client`](Self::client) for concurrent requests.
pub struct Session<B: DrawingBackend> {
    client: MathClient,
    model: SceneModel,
    reconciler: Reconciler,
    controller: InteractionController,
    backend: B,
    errors: Vec<InlineError>,
    explanation: Option<String>,
}

impl<B: DrawingBackend> Session<B> {
    pub fn new(host: impl HostFactory + 'static, mut backend: B, config: SessionConfig) -> Self {
        backend.set_viewport(config.viewport);
        let bridge = Arc::new(RpcBridge::new(host, config.bridge));

        Self {
            client: MathClient::new(bridge),
            model: SceneModel::new(),
            reconciler: Reconciler::new(),
            controller: InteractionController::new(config.interaction),
            backend,
            errors: Vec::new(),
            explanation: None,
        }
    }

    /// Validate a loaded configuration and build a session from it.
    pub fn from_config(
        host: impl HostFactory + 'static,
        backend: B,
        config: &MathboardConfig,
    ) -> Result<Self> {
        ConfigValidator::validate(config)?;
        Ok(Self::new(host, backend, SessionConfig::from(config)))
    }

    /// Start the computation host. Commands start it on demand as well.
    pub async fn start(&self) -> Result<()> {
        Ok(self.client.bridge().init().await?)
    }

    /// Replace a crashed or stuck host with a fresh one.
    pub async fn restart(&self) -> Result<()> {
        Ok(self.client.bridge().restart().await?)
    }

    pub fn shutdown(&self) {
        self.client.bridge().shutdown();
    }

    pub fn status(&self) -> WorkerStatus {
        self.client.bridge().status()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<WorkerStatus> {
        self.client.bridge().subscribe_status()
    }

    pub fn client(&self) -> &MathClient {
        &self.client
    }

    pub fn model(&self) -> &SceneModel {
        &self.model
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }

    /// Inline errors from the most recent result
    pub fn errors(&self) -> &[InlineError] {
        &self.errors
    }

    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    /// Elements in wire format, for use as intent-service context
    pub fn scene_context(&self) -> Vec<Element> {
        self.model.elements().to_vec()
    }

    /// Execute one command and show its result.
    pub async fn execute(&mut self, command: &Command) -> Result<ReconcileReport> {
        let result = self.client.execute(command).await?;
        self.apply_result(result)
    }

    /// Execute several commands concurrently and show their results in
    /// order. One failing command does not stop the others.
    pub async fn execute_all(&mut self, commands: &[Command]) -> Vec<Result<ReconcileReport>> {
        let client = self.client.clone();
        client
            .execute_all(commands)
            .await
            .into_iter()
            .map(|result| self.apply_result(result?))
            .collect()
    }

    /// Make a result the new scene. A graph or geometry result supersedes
    /// the previous scene wholesale; a failed result leaves it untouched.
    pub fn apply_result(&mut self, result: CommandResult) -> Result<ReconcileReport> {
        self.errors.clear();
        self.explanation = Some(result.explanation().to_string()).filter(|e| !e.is_empty());

        if !result.success() {
            let message = result.error().unwrap_or("computation failed");
            log::info!("Computation failed: {}", message);
            self.errors.push(InlineError::new(None, message));
            return Ok(self.sync());
        }

        let elements = match result {
            CommandResult::Graph(graph) => {
                let (elements, errors) = graph_elements(&graph);
                self.errors = errors;
                elements
            }
            CommandResult::Geometry(geometry) => geometry.elements,
        };
        self.model.replace_all(elements)?;
        Ok(self.sync())
    }

    /// Feed a pointer or wheel event through the interaction controller.
    ///
    /// Returns the reconciliation report when the gesture changed the model
    /// or released a locked element.
    pub fn handle_event(&mut self, event: WindowEvent) -> Result<Option<ReconcileReport>> {
        let held = self.controller.locked_element().is_some();
        let mutation = self
            .controller
            .handle_cursor_event(event, &self.reconciler, &mut self.backend);
        let released = held && self.controller.locked_element().is_none();

        let changed = match mutation {
            Some(SceneMutation::MovePoint { id, x, y }) => {
                match self.model.set_point_position(&id, x, y) {
                    Ok(()) => true,
                    // Replaced by a newer result while it was held
                    Err(e @ (SceneError::NotAFreePoint(_) | SceneError::NotFound(_))) => {
                        log::info!("Dropping drag of {}: {}", id, e);
                        false
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            Some(mutation) => {
                self.model.apply(mutation)?;
                true
            }
            None => false,
        };

        if changed || released {
            Ok(Some(self.sync()))
        } else {
            Ok(None)
        }
    }

    /// Delete an element with everything depending on it.
    pub fn delete(&mut self, id: &ElementId) -> Result<ReconcileReport> {
        self.mutate(SceneMutation::Delete { id: id.clone() })
    }

    pub fn set_visibility(&mut self, id: &ElementId, visible: bool) -> Result<ReconcileReport> {
        self.mutate(SceneMutation::SetVisibility {
            id: id.clone(),
            visible,
        })
    }

    /// Place a free point at user coordinates.
    pub fn place_point(&mut self, x: f64, y: f64) -> (ElementId, ReconcileReport) {
        let id = self.model.place_point(x, y);
        (id, self.sync())
    }

    /// Bring the live graph in line with the model, respecting any gesture
    /// in progress.
    pub fn sync(&mut self) -> ReconcileReport {
        let locked = self.controller.locked_element().cloned();
        self.reconciler
            .reconcile(&self.model, &mut self.backend, locked.as_ref())
    }

    fn mutate(&mut self, mutation: SceneMutation) -> Result<ReconcileReport> {
        self.model.apply(mutation)?;
        Ok(self.sync())
    }
}
