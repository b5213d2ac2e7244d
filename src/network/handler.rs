use crate::core::InventoryVector;

/// The synchronization layer as seen from the core: newly stamped objects
/// are announced to peers through [`NetworkHandler::offer`].
pub trait NetworkHandler: Send + Sync {
    fn offer(&self, iv: InventoryVector);
}
