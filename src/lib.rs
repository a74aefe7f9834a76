//! # SuriVR — cœur d'un navigateur immersif
//!
//! Gère un monde de widgets texturés (navigateur, barre de navigation,
//! clavier, panneaux) placés dans une scène 3D, les sessions de navigation
//! et les entrées du contrôleur. Le rendu natif et le moteur web sont
//! externes et branchés par des traits.
//!
//! ## Architecture des modules
//!
//! - [`placement`] : Handles de widgets, placements et conversions monde ↔ pixels.
//!
//! - [`command`] : File de commandes (création, mise à jour, retrait, fondu)
//!   vers le thread de rendu. Seul canal inter-threads.
//!
//! - [`registry`] : Registre des widgets vivants, chaîne de réactions entre
//!   widgets (un enfant suit son parent), encadrement des redimensionnements.
//!
//! - [`scene`] : Consommateur de référence de la file : résout chaque
//!   placement en transformée monde, sur un thread dédié.
//!
//! - [`engine`] : Contrat du moteur web (`Engine`, `EngineSession`) et moteur
//!   headless scripté pour le harnais et les tests.
//!
//! - [`session`] : Sessions de navigation, session courante, navigation privée
//!   et diffusion des notifications du moteur aux listeners.
//!
//! - [`widgets`] : Navigateur, barre de navigation (modes focus et
//!   redimensionnement), panneaux.
//!
//! - [`urlbar`] : Machine d'état de la barre d'URL.
//!
//! - [`gesture`] / [`timer`] : Double balayage → navigation, minuteries
//!   annulables interrogées par l'hôte.
//!
//! - [`back_handler`] : Pile LIFO d'interception du bouton retour.
//!
//! - [`orchestrator`] : Construit le monde et route les entrées de l'hôte.
//!
//! - [`config`] : Configuration TOML (`config.toml`).

pub mod back_handler;
pub mod command;
pub mod config;
pub mod engine;
pub mod gesture;
mod observer;
pub mod orchestrator;
pub mod placement;
pub mod registry;
pub mod scene;
pub mod session;
pub mod timer;
pub mod urlbar;
pub mod widgets;
