//! Surface de capacités du moteur de navigation embarqué.
//!
//! Le cœur ne connaît du moteur que ces traits :
//!
//! - [`Engine`] : fabrique de sessions (une par onglet logique, dont la
//!   session de navigation privée).
//! - [`EngineSession`] : affichage, entrée pointeur/texte, contrôle de
//!   navigation. Toutes les méthodes prennent `&self` :
//!   l'implémentation gère sa propre mutabilité intérieure.
//! - [`EngineEvent`] : callbacks du moteur (changement d'URL, progression,
//!   plein écran…), réinjectés par l'embedder via
//!   [`crate::session::SessionStore::handle_engine_event`].
//!
//! Les échecs remontent comme [`EngineError`] et sont seulement journalisés :
//! aucune politique de retry.
//!
//! [`headless::HeadlessEngine`] implémente ces traits sans rendu, pour le
//! binaire de démonstration et les tests.

pub mod headless;

use std::rc::Rc;

use euclid::default::{Point2D, Size2D, Vector2D};
use thiserror::Error;
use url::Url;

use crate::session::{SessionId, SessionSettings};

/// Échec d'un appel au moteur.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("display unavailable: {0}")]
    DisplayUnavailable(String),

    #[error("session {0} is closed")]
    SessionClosed(SessionId),

    #[error("session creation failed: {0}")]
    SessionCreation(String),

    #[error("navigation to {uri} refused: {reason}")]
    NavigationRefused { uri: String, reason: String },
}

/// Affichage acquis auprès d'une session (cible de composition du moteur).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DisplayId(pub u32);

/// Type d'événement pointeur injecté dans le pan/zoom du moteur.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerKind {
    Press,
    Release,
    Move,
    Scroll(Vector2D<f32>),
}

/// Événement pointeur en coordonnées de surface (pixels de texture).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub device: u32,
    pub kind: PointerKind,
    pub position: Point2D<f32>,
}

/// Événement clavier transmis à l'entrée texte de la session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub code: u32,
    pub pressed: bool,
}

/// Notifications émises par une session moteur.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    LocationChange(Url),
    CanGoBack(bool),
    CanGoForward(bool),
    PageStart(Url),
    PageStop { success: bool },
    SecurityChange { secure: bool },
    FullScreen(bool),
    TitleChange(Option<String>),
    /// Un champ éditable a pris (ou perdu) le focus dans la page.
    InputActive(bool),
}

/// Une session du moteur.
pub trait EngineSession {
    fn acquire_display(&self, size: Size2D<u32>) -> Result<DisplayId, EngineError>;
    fn resize_display(&self, display: DisplayId, size: Size2D<u32>) -> Result<(), EngineError>;
    fn release_display(&self, display: DisplayId);

    fn pointer_event(&self, event: PointerEvent);

    fn attach_text_input(&self);
    fn detach_text_input(&self);
    /// Retourne `true` si le moteur a consommé la touche.
    fn key_event(&self, event: KeyEvent) -> bool;

    fn go_back(&self);
    fn go_forward(&self);
    fn reload(&self);
    fn stop(&self);
    fn load(&self, uri: &Url) -> Result<(), EngineError>;
    fn exit_fullscreen(&self);

    /// Libère les ressources de la session. Plus aucun appel n'est attendu ensuite.
    fn close(&self);
}

/// Fabrique de sessions.
///
/// La session est partagée (`Rc`) : le store en est propriétaire, le widget
/// navigateur en garde une référence tant qu'il y est attaché.
pub trait Engine {
    fn create_session(
        &self,
        id: SessionId,
        settings: &SessionSettings,
    ) -> Result<Rc<dyn EngineSession>, EngineError>;
}
