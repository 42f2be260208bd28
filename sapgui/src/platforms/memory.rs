//! In-memory scripting host
//!
//! Models the parts of the SAP GUI scripting object model the library uses:
//! application root, scripting engine, connection/session collections and a
//! tree of components addressed by id. Property writes, method calls and
//! handle releases are recorded so tests can assert on them.

use super::{ForeignHandle, ForeignObject, ScriptingProvider, Variant};
use crate::errors::SapError;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Index of a node in a [`MemoryHost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// One recorded method invocation.
#[derive(Debug, Clone)]
pub struct MethodCall {
    pub method: String,
    pub args: Vec<Variant>,
}

#[derive(Debug, Clone)]
enum Stored {
    Value(Variant),
    Node(NodeId),
}

#[derive(Debug, Clone)]
enum Slot {
    Fixed(Stored),
    /// Each read pops one value; the last one sticks.
    Sequence(VecDeque<Stored>),
}

#[derive(Debug, Default)]
struct NodeData {
    type_tag: String,
    label: String,
    properties: BTreeMap<String, Slot>,
    methods: BTreeSet<String>,
    failing_methods: HashMap<String, String>,
    failing_writes: HashMap<String, String>,
    /// Objects returned by argument-less methods.
    method_results: HashMap<String, NodeId>,
    calls: Vec<MethodCall>,
    writes: Vec<(String, Variant)>,
    /// Collection members, for `GuiComponentCollection` nodes.
    items: Vec<NodeId>,
    /// Component registry, for session nodes.
    registry: HashMap<String, NodeId>,
    /// Grid cells keyed by (row, column name).
    cells: HashMap<(i64, String), String>,
    failing_cells: HashMap<(i64, String), String>,
    release_requests: usize,
    releases: usize,
}

#[derive(Debug, Default)]
struct HostState {
    nodes: Vec<NodeData>,
    running: bool,
    unreachable: Option<String>,
}

impl HostState {
    fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.0]
    }

    fn push(&mut self, type_tag: &str, label: &str) -> NodeId {
        self.nodes.push(NodeData {
            type_tag: type_tag.to_string(),
            label: label.to_string(),
            ..NodeData::default()
        });
        NodeId(self.nodes.len() - 1)
    }
}

/// Scriptable stand-in for a running SAP GUI.
#[derive(Clone)]
pub struct MemoryHost {
    state: Arc<Mutex<HostState>>,
    root: NodeId,
    connections: NodeId,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHost {
    /// A running host with a scripting engine and no connections.
    pub fn new() -> Self {
        let mut state = HostState {
            running: true,
            ..HostState::default()
        };
        let root = state.push("SapGuiAuto", "SAPGUI");
        let engine = state.push("GuiApplication", "/app");
        let connections = state.push("GuiComponentCollection", "/app/Connections");
        let root_node = state.node_mut(root);
        root_node.methods.insert("GetScriptingEngine".to_string());
        root_node
            .method_results
            .insert("GetScriptingEngine".to_string(), engine);
        state.node_mut(engine).properties.insert(
            "Connections".to_string(),
            Slot::Fixed(Stored::Node(connections)),
        );
        Self {
            state: Arc::new(Mutex::new(state)),
            root,
            connections,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Stops answering `application_root`, as if the host was never started.
    pub fn set_running(&self, running: bool) {
        self.lock().running = running;
    }

    /// Makes every call fail with a transport fault carrying `message`.
    pub fn set_unreachable(&self, message: Option<&str>) {
        self.lock().unreachable = message.map(str::to_string);
    }

    /// Adds a connection holding one session and returns the session node.
    pub fn add_session(&self) -> NodeId {
        let mut state = self.lock();
        let connections = self.connections;
        let index = state.node(connections).items.len();
        let connection_label = format!("/app/con[{index}]");
        let connection = state.push("GuiConnection", &connection_label);
        let sessions = state.push("GuiComponentCollection", &format!("{connection_label}/Sessions"));
        let session_label = format!("{connection_label}/ses[0]");
        let session = state.push("GuiSession", &session_label);

        state.node_mut(connections).items.push(connection);
        state.node_mut(sessions).items.push(session);
        let connection_node = state.node_mut(connection);
        connection_node
            .properties
            .insert("Sessions".to_string(), Slot::Fixed(Stored::Node(sessions)));
        connection_node.properties.insert(
            "Id".to_string(),
            Slot::Fixed(Stored::Value(Variant::from(connection_label.as_str()))),
        );

        let session_node = state.node_mut(session);
        session_node.methods.insert("FindById".to_string());
        for (name, value) in [
            ("Id", Variant::from(session_label.as_str())),
            ("Busy", Variant::Bool(false)),
            ("ActiveWindow", Variant::Empty),
        ] {
            session_node
                .properties
                .insert(name.to_string(), Slot::Fixed(Stored::Value(value)));
        }
        session
    }

    /// Registers a component under `path` (relative to the session, e.g.
    /// `wnd[0]/usr/txtRSYST-BNAME`) with the members SAP exposes for
    /// `type_tag`.
    pub fn add_component(&self, session: NodeId, path: &str, type_tag: &str) -> NodeId {
        let mut state = self.lock();
        let session_id = state.node(session).label.clone();
        let absolute = format!("{session_id}/{path}");
        let node = state.push(type_tag, &absolute);
        let name = path.rsplit('/').next().unwrap_or(path).to_string();

        let data = state.node_mut(node);
        let mut set = |key: &str, value: Variant| {
            data.properties
                .insert(key.to_string(), Slot::Fixed(Stored::Value(value)));
        };
        set("Id", Variant::from(absolute.as_str()));
        set("Name", Variant::from(name));
        set("Text", Variant::from(""));
        match type_tag {
            "GuiTextField" | "GuiCTextField" | "GuiPasswordField" => {
                set("CaretPosition", Variant::Int(0));
                set("MaxLength", Variant::Int(0));
            }
            "GuiCheckBox" => set("Selected", Variant::Bool(false)),
            "GuiStatusbar" => set("MessageType", Variant::from("")),
            "GuiGridView" => {
                set("RowCount", Variant::Int(0));
                set("ColumnCount", Variant::Int(0));
                set("VisibleRowCount", Variant::Int(0));
            }
            _ => {}
        }
        let methods: &[&str] = match type_tag {
            "GuiMainWindow" | "GuiModalWindow" | "GuiDialogShell" => {
                &["SetFocus", "SendVKey", "Maximize", "Close"]
            }
            "GuiButton" => &["SetFocus", "Press"],
            "GuiGridView" => &[
                "SetFocus",
                "GetCellValue",
                "SetCellValue",
                "SetCurrentCell",
                "DoubleClickCurrentCell",
            ],
            _ => &["SetFocus"],
        };
        data.methods.extend(methods.iter().map(|m| m.to_string()));

        state
            .node_mut(session)
            .registry
            .insert(path.to_string(), node);
        node
    }

    pub fn set_property(&self, node: NodeId, name: &str, value: impl Into<Variant>) {
        self.lock()
            .node_mut(node)
            .properties
            .insert(name.to_string(), Slot::Fixed(Stored::Value(value.into())));
    }

    /// Successive reads of `name` return `values` in order, then the last
    /// value forever.
    pub fn set_property_sequence(&self, node: NodeId, name: &str, values: Vec<Variant>) {
        let values = values.into_iter().map(Stored::Value).collect();
        self.lock()
            .node_mut(node)
            .properties
            .insert(name.to_string(), Slot::Sequence(values));
    }

    pub fn remove_property(&self, node: NodeId, name: &str) {
        self.lock().node_mut(node).properties.remove(name);
    }

    pub fn remove_method(&self, node: NodeId, name: &str) {
        self.lock().node_mut(node).methods.remove(name);
    }

    /// Makes `method` on `node` fail with a transport fault.
    pub fn fail_method(&self, node: NodeId, method: &str, message: &str) {
        self.lock()
            .node_mut(node)
            .failing_methods
            .insert(method.to_string(), message.to_string());
    }

    /// Makes writes to `property` on `node` fail with a transport fault.
    /// Reads are unaffected.
    pub fn fail_write(&self, node: NodeId, property: &str, message: &str) {
        self.lock()
            .node_mut(node)
            .failing_writes
            .insert(property.to_string(), message.to_string());
    }

    pub fn set_active_window(&self, session: NodeId, window: NodeId) {
        self.lock().node_mut(session).properties.insert(
            "ActiveWindow".to_string(),
            Slot::Fixed(Stored::Node(window)),
        );
    }

    /// Fills a grid node: `columns` are (technical name, title) pairs and
    /// each row holds one value per column.
    pub fn set_grid(&self, grid: NodeId, columns: &[(&str, &str)], rows: &[Vec<&str>]) {
        let mut state = self.lock();
        let grid_label = state.node(grid).label.clone();
        let collection = state.push("GuiCollection", &format!("{grid_label}/Columns"));
        for (name, title) in columns {
            let column = state.push("GuiGridColumn", &format!("{grid_label}/{name}"));
            let data = state.node_mut(column);
            data.properties.insert(
                "Name".to_string(),
                Slot::Fixed(Stored::Value(Variant::from(*name))),
            );
            data.properties.insert(
                "Title".to_string(),
                Slot::Fixed(Stored::Value(Variant::from(*title))),
            );
            state.node_mut(collection).items.push(column);
        }

        let data = state.node_mut(grid);
        data.properties
            .insert("Columns".to_string(), Slot::Fixed(Stored::Node(collection)));
        for (key, value) in [
            ("RowCount", rows.len()),
            ("ColumnCount", columns.len()),
            ("VisibleRowCount", rows.len().min(20)),
        ] {
            data.properties.insert(
                key.to_string(),
                Slot::Fixed(Stored::Value(Variant::from(value))),
            );
        }
        data.cells.clear();
        for (row_index, row) in rows.iter().enumerate() {
            for ((name, _), value) in columns.iter().zip(row) {
                data.cells
                    .insert((row_index as i64, name.to_string()), value.to_string());
            }
        }
    }

    /// Makes reading one grid cell fail with a transport fault.
    pub fn fail_cell(&self, grid: NodeId, row: i64, column: &str, message: &str) {
        self.lock()
            .node_mut(grid)
            .failing_cells
            .insert((row, column.to_string()), message.to_string());
    }

    pub fn cell(&self, grid: NodeId, row: i64, column: &str) -> Option<String> {
        self.lock()
            .node(grid)
            .cells
            .get(&(row, column.to_string()))
            .cloned()
    }

    /// Current value of a plain property, for assertions.
    pub fn property(&self, node: NodeId, name: &str) -> Option<Variant> {
        match self.lock().node(node).properties.get(name) {
            Some(Slot::Fixed(Stored::Value(v))) => Some(v.clone()),
            Some(Slot::Sequence(values)) => match values.front() {
                Some(Stored::Value(v)) => Some(v.clone()),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn calls(&self, node: NodeId) -> Vec<MethodCall> {
        self.lock().node(node).calls.clone()
    }

    pub fn calls_named(&self, node: NodeId, method: &str) -> Vec<MethodCall> {
        self.calls(node)
            .into_iter()
            .filter(|c| c.method == method)
            .collect()
    }

    pub fn writes(&self, node: NodeId) -> Vec<(String, Variant)> {
        self.lock().node(node).writes.clone()
    }

    /// Every `release` request made against handles to `node`.
    pub fn release_requests(&self, node: NodeId) -> usize {
        self.lock().node(node).release_requests
    }

    /// Releases that actually dropped a live handle to `node`.
    pub fn releases(&self, node: NodeId) -> usize {
        self.lock().node(node).releases
    }

    /// A fresh handle to `node`, as the host would hand it out.
    pub fn handle(&self, node: NodeId) -> ForeignHandle {
        ForeignHandle::new(MemoryObject {
            state: self.state.clone(),
            node,
            released: AtomicBool::new(false),
        })
    }

    pub fn root(&self) -> NodeId {
        self.root
    }
}

impl ScriptingProvider for MemoryHost {
    fn application_root(&self) -> Result<Option<ForeignHandle>, SapError> {
        let state = self.lock();
        if let Some(message) = &state.unreachable {
            return Err(SapError::transport("GetActiveObject", "SAPGUI", message));
        }
        if !state.running {
            debug!("Memory host is not running");
            return Ok(None);
        }
        drop(state);
        Ok(Some(self.handle(self.root)))
    }
}

struct MemoryObject {
    state: Arc<Mutex<HostState>>,
    node: NodeId,
    released: AtomicBool,
}

impl MemoryObject {
    fn lock(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn handle_to(&self, node: NodeId) -> ForeignHandle {
        ForeignHandle::new(MemoryObject {
            state: self.state.clone(),
            node,
            released: AtomicBool::new(false),
        })
    }

    fn materialize(&self, stored: Stored) -> Variant {
        match stored {
            Stored::Value(v) => v,
            Stored::Node(id) => Variant::Object(self.handle_to(id)),
        }
    }

    /// Rejects calls on a released handle or an unreachable host.
    fn guard(&self, state: &HostState, member: &str) -> Result<(), SapError> {
        if self.released.load(Ordering::SeqCst) {
            return Err(SapError::HandleReleased(format!(
                "{} ({member})",
                state.node(self.node).label
            )));
        }
        if let Some(message) = &state.unreachable {
            return Err(SapError::transport(
                member,
                state.node(self.node).label.clone(),
                message.clone(),
            ));
        }
        Ok(())
    }

    fn missing(&self, state: &HostState, member: &str) -> SapError {
        SapError::MemberNotFound {
            member: member.to_string(),
            target: state.node(self.node).label.clone(),
        }
    }
}

fn arg_string(args: &[Variant], index: usize, method: &str) -> Result<String, SapError> {
    args.get(index)
        .cloned()
        .unwrap_or_default()
        .into_string(method)
}

fn arg_i64(args: &[Variant], index: usize, method: &str) -> Result<i64, SapError> {
    args.get(index)
        .ok_or_else(|| SapError::InvalidArgument(format!("{method} expects argument {index}")))?
        .as_i64(method)
}

impl ForeignObject for MemoryObject {
    fn get(&self, name: &str) -> Result<Variant, SapError> {
        let mut state = self.lock();
        self.guard(&state, name)?;
        let node = state.node_mut(self.node);
        match name {
            "Type" => return Ok(Variant::from(node.type_tag.as_str())),
            "Count" if node.type_tag.ends_with("Collection") => {
                return Ok(Variant::from(node.items.len()))
            }
            _ => {}
        }
        let stored = match node.properties.get_mut(name) {
            Some(Slot::Fixed(stored)) => Some(stored.clone()),
            Some(Slot::Sequence(values)) if values.len() > 1 => values.pop_front(),
            Some(Slot::Sequence(values)) => values.front().cloned(),
            None => None,
        };
        let Some(stored) = stored else {
            return Err(self.missing(&state, name));
        };
        drop(state);
        Ok(self.materialize(stored))
    }

    fn put(&self, name: &str, value: Variant) -> Result<(), SapError> {
        let mut state = self.lock();
        self.guard(&state, name)?;
        if !state.node(self.node).properties.contains_key(name) {
            return Err(self.missing(&state, name));
        }
        if let Some(message) = state.node(self.node).failing_writes.get(name) {
            return Err(SapError::transport(
                name,
                state.node(self.node).label.clone(),
                message.clone(),
            ));
        }
        let node = state.node_mut(self.node);
        node.writes.push((name.to_string(), value.clone()));
        node.properties
            .insert(name.to_string(), Slot::Fixed(Stored::Value(value)));
        Ok(())
    }

    fn call(&self, name: &str, args: &[Variant]) -> Result<Variant, SapError> {
        let mut state = self.lock();
        self.guard(&state, name)?;
        let label = state.node(self.node).label.clone();
        let is_collection = state.node(self.node).type_tag.ends_with("Collection");
        if !(state.node(self.node).methods.contains(name) || (is_collection && name == "ElementAt"))
        {
            return Err(self.missing(&state, name));
        }
        state.node_mut(self.node).calls.push(MethodCall {
            method: name.to_string(),
            args: args.to_vec(),
        });
        if let Some(message) = state.node(self.node).failing_methods.get(name) {
            return Err(SapError::transport(name, label, message.clone()));
        }

        if let Some(result) = state.node(self.node).method_results.get(name).copied() {
            drop(state);
            return Ok(Variant::Object(self.handle_to(result)));
        }

        match name {
            "ElementAt" => {
                let index = arg_i64(args, 0, name)?;
                let item = usize::try_from(index)
                    .ok()
                    .and_then(|i| state.node(self.node).items.get(i).copied());
                drop(state);
                match item {
                    Some(item) => Ok(Variant::Object(self.handle_to(item))),
                    None => Err(SapError::ElementNotFound(format!("{label}[{index}]"))),
                }
            }
            "FindById" => {
                let path = arg_string(args, 0, name)?;
                let relative = path
                    .strip_prefix(&format!("{label}/"))
                    .unwrap_or(&path)
                    .trim_start_matches('/')
                    .to_string();
                let found = state.node(self.node).registry.get(&relative).copied();
                drop(state);
                match found {
                    Some(node) => Ok(Variant::Object(self.handle_to(node))),
                    None => Err(SapError::Transport {
                        operation: name.to_string(),
                        target: path,
                        message: "The control could not be found by id.".to_string(),
                        code: Some(0x8000_4005_u32 as i32),
                    }),
                }
            }
            "GetCellValue" => {
                let key = (arg_i64(args, 0, name)?, arg_string(args, 1, name)?);
                let node = state.node(self.node);
                if let Some(message) = node.failing_cells.get(&key) {
                    return Err(SapError::transport(name, label, message.clone()));
                }
                match node.cells.get(&key) {
                    Some(value) => Ok(Variant::from(value.as_str())),
                    None => Err(SapError::transport(
                        name,
                        label,
                        format!("Invalid cell ({}, {})", key.0, key.1),
                    )),
                }
            }
            "SetCellValue" => {
                let key = (arg_i64(args, 0, name)?, arg_string(args, 1, name)?);
                let value = arg_string(args, 2, name)?;
                state.node_mut(self.node).cells.insert(key, value);
                Ok(Variant::Empty)
            }
            _ => Ok(Variant::Empty),
        }
    }

    fn exposes(&self, name: &str) -> Result<bool, SapError> {
        let state = self.lock();
        self.guard(&state, name)?;
        let node = state.node(self.node);
        Ok(matches!(name, "Type")
            || node.properties.contains_key(name)
            || node.methods.contains(name))
    }

    fn release(&self) {
        let mut state = self.lock();
        let node = state.node_mut(self.node);
        node.release_requests += 1;
        if !self.released.swap(true, Ordering::SeqCst) {
            node.releases += 1;
        }
    }

    fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    fn describe(&self) -> String {
        let state = self.lock();
        let node = state.node(self.node);
        format!("{} {}", node.type_tag, node.label)
    }
}
