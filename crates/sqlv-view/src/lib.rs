//! View-state synchronization for the sqlv console
//!
//! The [`Console`] owns a [`ViewStateStore`], a [`RemoteGateway`] and a host
//! [`Surface`]. Host events are decoded once into an [`Action`] and routed by
//! exhaustive match; every successful response replaces the cached view state
//! wholesale and the affected region is re-rendered from it.
//!
//! [`RemoteGateway`]: sqlv_gateway::RemoteGateway

pub mod console;
pub mod dispatch;
pub mod forms;
pub mod render;
pub mod rows;
pub mod state;
pub mod surface;
pub mod testing;

pub use console::{Catalog, Console};
pub use dispatch::{decode, Action, ElementRef, Listener, UiEvent};
pub use forms::{ColumnGroup, DynamicForm, FieldGroup, GroupId, IndexColumnGroup};
pub use rows::{delete_request, primary_key_condition, FormField, InputType, RowForm, RowFormKind};
pub use state::{LoadOutcome, LoadTicket, ViewState, ViewStateStore};
pub use surface::{Dialog, Panel, Region, Surface};
