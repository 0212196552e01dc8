mod command_input;
mod confirm;
mod form;
mod input;
mod search_input;
mod toast;

pub use command_input::{CommandEvent, CommandInput};
pub use confirm::Confirm;
pub use form::{Form, FormEvent};
pub use input::{InputResult, TextInput};
pub use search_input::{SearchEvent, SearchInput};
pub use toast::{Toast, ToastLevel, Toasts};

/// Outcome of offering a key to a component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyResult<T> {
  /// Key was consumed, nothing for the parent to do
  Handled,
  /// Key was consumed and produced an event for the parent
  Event(T),
  /// Key was not consumed, parent should try the next handler
  NotHandled,
}
