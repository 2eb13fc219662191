//! Node items: sockets and plain properties.
//!
//! Every item lives in its node's item list and carries a [`LocalId`] that is unique
//! within the node. Items store their values dynamically as [`Value`]; the typed
//! handles ([`InputSocket`], [`OutputSocket`], [`ListInputSocket`], [`PropertyItem`])
//! give node implementations a checked view over that store.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use log::trace;
use nodeflow_api_core::coercion::accept_number;
use nodeflow_api_core::{Value, ValueKind};
use serde::{Deserialize, Serialize};

use crate::ids::{ConnectionKey, LocalId, NodeKey, SocketRef};
use crate::property::PropertyAdapter;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// Receives at most one upstream value.
    Input,
    /// Pulls an ordered list of upstream values at evaluation time.
    ListInput,
    /// Produces a value that fans out to any number of inputs.
    Output,
    /// Property without a socket.
    Property,
}

impl ItemKind {
    pub fn is_input(self) -> bool {
        matches!(self, ItemKind::Input | ItemKind::ListInput)
    }
}

/// Outcome of the last delivery over a connection.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// Nothing delivered yet.
    #[default]
    Pending,
    Success,
    /// Delivered after conversion by a receiver.
    Converted,
    /// Rejected; the input fell back to its default.
    Error,
}

/// Converts a value of foreign kind into the socket's declared kind.
pub type Receiver = Arc<dyn Fn(ValueKind, &Value) -> Option<Value> + Send + Sync>;

/// One entry of a node's item list.
#[derive(Clone)]
pub struct NodeItem {
    pub(crate) local_id: LocalId,
    pub(crate) owner: NodeKey,
    pub(crate) name: String,
    pub(crate) kind: ItemKind,
    pub(crate) value_kind: ValueKind,
    pub(crate) value: Value,
    pub(crate) property: Option<PropertyAdapter>,
    pub(crate) display_name: Option<String>,
    pub(crate) valid: bool,
    pub(crate) connections: Vec<ConnectionKey>,
    pub(crate) receiver: Option<Receiver>,
}

impl NodeItem {
    pub(crate) fn new(
        local_id: LocalId,
        name: impl Into<String>,
        kind: ItemKind,
        value_kind: ValueKind,
        default: Option<Value>,
    ) -> Self {
        let value = default
            .clone()
            .unwrap_or_else(|| Value::default_for(value_kind));
        NodeItem {
            local_id,
            owner: NodeKey::default(),
            name: name.into(),
            kind,
            value_kind,
            value,
            property: default.map(PropertyAdapter::new),
            display_name: None,
            valid: true,
            connections: Vec::new(),
            receiver: None,
        }
    }

    pub fn local_id(&self) -> LocalId {
        self.local_id
    }

    pub fn socket_ref(&self) -> SocketRef {
        SocketRef::new(self.owner, self.local_id)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    pub fn value_kind(&self) -> ValueKind {
        self.value_kind
    }

    /// Current value. For list inputs this is a [`Value::List`] of the collected values.
    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn property(&self) -> Option<&PropertyAdapter> {
        self.property.as_ref()
    }

    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    pub fn set_display_name(&mut self, name: impl Into<String>) {
        self.display_name = Some(name.into());
    }

    /// False after the last delivered value was rejected.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Connections in connect order.
    pub fn connections(&self) -> &[ConnectionKey] {
        &self.connections
    }

    pub fn is_connected(&self) -> bool {
        !self.connections.is_empty()
    }

    /// Value used when nothing (valid) is delivered.
    pub(crate) fn fallback(&self) -> Value {
        self.property
            .as_ref()
            .map(|p| p.default_value().clone())
            .unwrap_or_else(|| Value::default_for(self.value_kind))
    }

    /// Convert `value` into this socket's kind, or `None` when it is rejected.
    pub(crate) fn coerce(&self, value: &Value, coerce: bool) -> Option<(Value, bool)> {
        if self.value_kind.accepts(value.kind()) {
            return Some((value.clone(), false));
        }
        if !coerce {
            return None;
        }
        let converted = match &self.receiver {
            Some(receiver) => receiver(self.value_kind, value),
            None => accept_number(self.value_kind, value),
        };
        converted.map(|v| (v, true))
    }

    /// Deliver an upstream value.
    pub(crate) fn receive(&mut self, value: &Value, coerce: bool) -> ConnectionStatus {
        match self.coerce(value, coerce) {
            Some((v, converted)) => {
                self.value = v;
                self.valid = true;
                if converted {
                    ConnectionStatus::Converted
                } else {
                    ConnectionStatus::Success
                }
            }
            None => {
                trace!(
                    "socket `{}` rejected a {} value, falling back to default",
                    self.name,
                    value.kind().name()
                );
                self.value = self.fallback();
                self.valid = false;
                ConnectionStatus::Error
            }
        }
    }
}

impl fmt::Debug for NodeItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeItem")
            .field("local_id", &self.local_id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("value_kind", &self.value_kind)
            .field("value", &self.value)
            .field("valid", &self.valid)
            .field("connections", &self.connections.len())
            .field("receiver", &self.receiver.is_some())
            .finish()
    }
}

/// Rust types that map onto a single [`ValueKind`].
pub trait SocketValue: Sized {
    const KIND: ValueKind;
    fn from_value(value: &Value) -> Option<Self>;
    fn into_value(self) -> Value;
}

impl SocketValue for f32 {
    const KIND: ValueKind = ValueKind::Float;
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f32),
            _ => None,
        }
    }
    fn into_value(self) -> Value {
        Value::Float(self)
    }
}

impl SocketValue for i64 {
    const KIND: ValueKind = ValueKind::Int;
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(i) => Some(*i),
            Value::Float(f) => Some(f.trunc() as i64),
            _ => None,
        }
    }
    fn into_value(self) -> Value {
        Value::Int(self)
    }
}

impl SocketValue for bool {
    const KIND: ValueKind = ValueKind::Bool;
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

impl SocketValue for [f32; 2] {
    const KIND: ValueKind = ValueKind::Vec2;
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Vec2(v) | Value::Size(v) => Some(*v),
            _ => None,
        }
    }
    fn into_value(self) -> Value {
        Value::Vec2(self)
    }
}

impl SocketValue for String {
    const KIND: ValueKind = ValueKind::Text;
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Text(s) => Some(s.clone()),
            _ => None,
        }
    }
    fn into_value(self) -> Value {
        Value::Text(self)
    }
}

impl SocketValue for Value {
    const KIND: ValueKind = ValueKind::Any;
    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
    fn into_value(self) -> Value {
        self
    }
}

macro_rules! typed_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        pub struct $name<T> {
            local: LocalId,
            _marker: PhantomData<fn() -> T>,
        }

        impl<T> $name<T> {
            pub(crate) fn new(local: LocalId) -> Self {
                $name {
                    local,
                    _marker: PhantomData,
                }
            }

            pub fn local_id(&self) -> LocalId {
                self.local
            }
        }

        impl<T> Clone for $name<T> {
            fn clone(&self) -> Self {
                *self
            }
        }

        impl<T> Copy for $name<T> {}

        /// Placeholder until [`NodeBehavior::build_items`](crate::NodeBehavior::build_items) assigns the real id.
        impl<T> Default for $name<T> {
            fn default() -> Self {
                Self::new(LocalId(0))
            }
        }

        impl<T> fmt::Debug for $name<T> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.local).finish()
            }
        }
    };
}

typed_handle!(
    /// Scalar input of type `T`.
    InputSocket
);
typed_handle!(
    /// Output of type `T`.
    OutputSocket
);
typed_handle!(
    /// Fan-in input collecting values of type `T` in connection order.
    ListInputSocket
);
typed_handle!(
    /// Socket-less property of type `T`.
    PropertyItem
);

/// Appends items to a node while it is being constructed.
pub struct ItemBuilder<'a> {
    items: &'a mut Vec<NodeItem>,
    next_local_id: &'a mut u32,
}

impl<'a> ItemBuilder<'a> {
    pub(crate) fn new(items: &'a mut Vec<NodeItem>, next_local_id: &'a mut u32) -> Self {
        ItemBuilder {
            items,
            next_local_id,
        }
    }

    fn push(
        &mut self,
        name: &str,
        kind: ItemKind,
        value_kind: ValueKind,
        default: Option<Value>,
    ) -> LocalId {
        let local = LocalId(*self.next_local_id);
        *self.next_local_id += 1;
        self.items
            .push(NodeItem::new(local, name, kind, value_kind, default));
        local
    }

    pub fn input<T: SocketValue>(&mut self, name: &str, default: T) -> InputSocket<T> {
        InputSocket::new(self.push(name, ItemKind::Input, T::KIND, Some(default.into_value())))
    }

    /// Input whose declared kind differs from `T::KIND`, e.g. a `Size` read as [`Value`].
    pub fn input_of(&mut self, name: &str, kind: ValueKind, default: Value) -> InputSocket<Value> {
        InputSocket::new(self.push(name, ItemKind::Input, kind, Some(default)))
    }

    pub fn output<T: SocketValue>(&mut self, name: &str) -> OutputSocket<T> {
        OutputSocket::new(self.push(name, ItemKind::Output, T::KIND, None))
    }

    pub fn output_of(&mut self, name: &str, kind: ValueKind) -> OutputSocket<Value> {
        OutputSocket::new(self.push(name, ItemKind::Output, kind, None))
    }

    pub fn list_input<T: SocketValue>(&mut self, name: &str) -> ListInputSocket<T> {
        let local = self.push(name, ItemKind::ListInput, T::KIND, None);
        if let Some(item) = self.items.last_mut() {
            item.value = Value::List(Vec::new());
        }
        ListInputSocket::new(local)
    }

    pub fn property<T: SocketValue>(&mut self, name: &str, default: T) -> PropertyItem<T> {
        PropertyItem::new(self.push(
            name,
            ItemKind::Property,
            T::KIND,
            Some(default.into_value()),
        ))
    }

    pub fn property_of(&mut self, name: &str, kind: ValueKind, default: Value) -> PropertyItem<Value> {
        PropertyItem::new(self.push(name, ItemKind::Property, kind, Some(default)))
    }

    /// Install a receiver on the most recently added item.
    pub fn with_receiver(&mut self, receiver: Receiver) -> &mut Self {
        if let Some(item) = self.items.last_mut() {
            item.receiver = Some(receiver);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(kind: ValueKind, default: Value) -> NodeItem {
        NodeItem::new(LocalId(0), "in", ItemKind::Input, kind, Some(default))
    }

    #[test]
    fn exact_kind_is_success() {
        let mut item = input(ValueKind::Float, Value::Float(0.0));
        assert_eq!(item.receive(&Value::Float(2.0), true), ConnectionStatus::Success);
        assert_eq!(item.value(), &Value::Float(2.0));
    }

    #[test]
    fn number_into_size_is_converted() {
        let mut item = input(ValueKind::Size, Value::Size([1.0, 1.0]));
        assert_eq!(
            item.receive(&Value::Float(3.0), true),
            ConnectionStatus::Converted
        );
        assert_eq!(item.value(), &Value::Size([3.0, 3.0]));
        assert!(item.is_valid());
    }

    #[test]
    fn rejection_falls_back_to_default_and_clears_validity() {
        let mut item = input(ValueKind::Float, Value::Float(7.0));
        item.value = Value::Float(1.0);
        assert_eq!(item.receive(&Value::Bool(true), true), ConnectionStatus::Error);
        assert_eq!(item.value(), &Value::Float(7.0));
        assert!(!item.is_valid());

        assert_eq!(item.receive(&Value::Float(2.0), true), ConnectionStatus::Success);
        assert!(item.is_valid());
    }

    #[test]
    fn coercion_can_be_disabled() {
        let mut item = input(ValueKind::Size, Value::Size([1.0, 1.0]));
        assert_eq!(item.receive(&Value::Float(3.0), false), ConnectionStatus::Error);
        assert_eq!(item.value(), &Value::Size([1.0, 1.0]));
    }

    #[test]
    fn custom_receiver_replaces_default_coercion() {
        let mut item = input(ValueKind::Bool, Value::Bool(false));
        item.receiver = Some(Arc::new(|_: ValueKind, v: &Value| match v {
            Value::Float(f) => Some(Value::Bool(*f > 0.5)),
            _ => None,
        }));
        assert_eq!(
            item.receive(&Value::Float(0.9), true),
            ConnectionStatus::Converted
        );
        assert_eq!(item.value(), &Value::Bool(true));
    }

    #[test]
    fn builder_assigns_increasing_local_ids() {
        let mut items = Vec::new();
        let mut next = 0;
        let mut builder = ItemBuilder::new(&mut items, &mut next);
        let a = builder.input("a", 1.0f32);
        let out = builder.output::<f32>("out");
        let list = builder.list_input::<f32>("values");
        assert_eq!(a.local_id(), LocalId(0));
        assert_eq!(out.local_id(), LocalId(1));
        assert_eq!(list.local_id(), LocalId(2));
        assert_eq!(next, 3);
        assert_eq!(items[2].value(), &Value::List(Vec::new()));
        assert!(items[1].property().is_none());
    }
}
