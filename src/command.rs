//! File de commandes vers le thread de rendu.
//!
//! Seul canal inter-threads du cœur : le thread UI pousse des commandes de
//! cycle de vie des widgets, le thread de rendu les consomme dans l'ordre.
//!
//! ```text
//! Thread UI (registre, sessions)          Thread de rendu (scène native)
//!   CommandSender::push(Create)  ──┐
//!   CommandSender::push(Update)  ──┼──▶  CommandReceiver::recv()
//!   CommandSender::push(Remove)  ──┘        └─ Scene::apply()
//! ```
//!
//! Aucune fusion : deux `Update` successifs du même widget sont livrés tous
//! les deux. Chaque commande porte un instantané complet du placement, donc
//! le consommateur peut appliquer une commande périmée sans incohérence.

use std::sync::mpsc;
use std::time::Duration;

use tracing::warn;

use crate::placement::{Placement, WidgetHandle};

/// Commande de cycle de vie destinée au moteur de rendu.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Create {
        handle: WidgetHandle,
        placement: Placement,
    },
    Update {
        handle: WidgetHandle,
        placement: Placement,
    },
    Remove(WidgetHandle),
    BeginResize(WidgetHandle),
    EndResize(WidgetHandle),
    FadeOut,
    FadeIn,
}

impl Command {
    /// Widget ciblé, `None` pour les commandes globales (fondu).
    pub fn handle(&self) -> Option<WidgetHandle> {
        match self {
            Self::Create { handle, .. } | Self::Update { handle, .. } => Some(*handle),
            Self::Remove(handle) | Self::BeginResize(handle) | Self::EndResize(handle) => {
                Some(*handle)
            }
            Self::FadeOut | Self::FadeIn => None,
        }
    }
}

/// Crée une file non bornée producteur(s) → consommateur unique.
pub fn command_queue() -> (CommandSender, CommandReceiver) {
    let (tx, rx) = mpsc::channel();
    (CommandSender(tx), CommandReceiver(rx))
}

/// Côté producteur. `push()` ne bloque jamais.
#[derive(Debug, Clone)]
pub struct CommandSender(mpsc::Sender<Command>);

impl CommandSender {
    /// Envoie une commande au thread de rendu.
    ///
    /// Si le consommateur a disparu, la commande est abandonnée et l'échec
    /// journalisé : il n'existe pas de canal d'acquittement.
    pub fn push(&self, command: Command) {
        if let Err(error) = self.0.send(command) {
            warn!(command = ?error.0, "Render consumer gone, command dropped");
        }
    }
}

/// Côté consommateur, détenu par le thread de rendu.
#[derive(Debug)]
pub struct CommandReceiver(mpsc::Receiver<Command>);

impl CommandReceiver {
    /// Attend la prochaine commande. `None` quand tous les producteurs sont fermés.
    pub fn recv(&self) -> Option<Command> {
        self.0.recv().ok()
    }

    /// Attend au plus `timeout`.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Command> {
        self.0.recv_timeout(timeout).ok()
    }

    /// Commande suivante si elle est déjà disponible.
    pub fn try_next(&self) -> Option<Command> {
        self.0.try_recv().ok()
    }

    /// Vide la file sans bloquer, dans l'ordre de soumission.
    pub fn drain(&self) -> Vec<Command> {
        self.0.try_iter().collect()
    }
}
