use crate::error::FaceError;
use crate::structs::*;

pub mod memory;

/// Receives the single outcome of an expressed Interest
pub type OutcomeCallback = Box<dyn FnOnce(InterestOutcome) + Send>;
/// Receives every Interest matching a registered prefix
pub type InterestCallback = Box<dyn FnMut(Interest) + Send>;
/// Receives the reason of a failed prefix registration
pub type RegisterFailedCallback = Box<dyn FnOnce(String) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegisteredPrefixId(pub u64);

/// The messaging collaborator the engines talk through.
///
/// Callbacks may be invoked from any thread, possibly before the call that registered them
/// returns. They must not call back into the face.
pub trait Face {
    /// Send an Interest. `on_outcome` is invoked at most once, with Data, a Nack or a timeout.
    fn express_interest(
        &mut self,
        interest: Interest,
        on_outcome: OutcomeCallback,
    ) -> Result<(), FaceError>;

    /// Ask to receive the Interests under `prefix`. A failure may be reported synchronously
    /// through the result or later through `on_failure`.
    fn register_prefix(
        &mut self,
        prefix: &Name,
        on_interest: InterestCallback,
        on_failure: RegisterFailedCallback,
    ) -> Result<RegisteredPrefixId, FaceError>;

    fn unregister_prefix(&mut self, id: RegisteredPrefixId);

    /// Sign `data` in place according to the signing policy
    fn sign(&mut self, data: &mut Data, signing_info: &SigningInfo) -> Result<(), FaceError>;

    /// Send Data answering a previously received Interest
    fn put(&mut self, data: Data) -> Result<(), FaceError>;

    /// Release every registration. The face cannot be used afterwards.
    fn shutdown(&mut self);
}
