// ── Conversation engine ──
//
// Per-operator state machine driving the multi-step add/modify flows
// and routing everything else: wake-by-name, single-line quick
// commands, menu selections, and cancellation. Owns the registry and
// the collaborator seams; the chat transport never sees domain state.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::CoreError;
use crate::event::{Command, Event, EventKind, MessageId, Selection, SessionId};
use crate::gateway::{Button, MessageGateway};
use crate::model::{Device, MacAddress};
use crate::registry::DeviceRegistry;
use crate::wol::{PacketSender, magic_packet};

const MAC_FORMAT_HINT: &str = "XX:XX:XX:XX:XX:XX";

/// An in-progress multi-step flow for one session. Absence of an entry
/// in the flow map means idle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    /// `/add` started; waiting for the device name.
    AddAwaitingName,
    /// Name captured; waiting for the MAC. Invalid input re-prompts
    /// without leaving this state.
    AddAwaitingMac { name: String },
    /// Waiting for a replacement name for `target`.
    ModifyName { target: String },
    /// Waiting for a replacement MAC for `target`. Invalid input is a
    /// hard cancel here, unlike the add flow — deliberate asymmetry
    /// carried over from the original behavior.
    ModifyMac { target: String },
}

/// Drives all operator interaction for the bot.
pub struct Engine {
    registry: DeviceRegistry,
    gateway: Arc<dyn MessageGateway>,
    sender: Arc<dyn PacketSender>,
    authorized: SessionId,
    flows: HashMap<SessionId, Flow>,
    /// Transient inline-button prompts, retracted before any new one.
    prompts: HashMap<SessionId, Vec<MessageId>>,
}

impl Engine {
    pub fn new(
        registry: DeviceRegistry,
        authorized: SessionId,
        gateway: Arc<dyn MessageGateway>,
        sender: Arc<dyn PacketSender>,
    ) -> Self {
        Self {
            registry,
            gateway,
            sender,
            authorized,
            flows: HashMap::new(),
            prompts: HashMap::new(),
        }
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    /// Current flow state for a session, if any.
    pub fn flow(&self, session: SessionId) -> Option<&Flow> {
        self.flows.get(&session)
    }

    /// Process one inbound event to completion. Domain errors become
    /// chat notices; only delivery failures propagate.
    pub async fn handle(&mut self, event: Event) -> Result<(), CoreError> {
        if event.session != self.authorized {
            info!(session = %event.session, "rejecting unauthorized session");
            return self.gateway.send_text(event.session, "Unauthorized user").await;
        }

        let session = event.session;
        match event.kind {
            EventKind::Command(cmd) => self.handle_command(session, cmd).await,
            EventKind::Selection(sel) => self.handle_selection(session, sel).await,
            EventKind::Text(text) => self.handle_text(session, &text).await,
        }
    }

    // ── Command routing ──────────────────────────────────────────────

    async fn handle_command(&mut self, session: SessionId, cmd: Command) -> Result<(), CoreError> {
        match cmd {
            Command::Help => self.send_help(session).await,
            Command::Wol => self.send_wake_menu(session).await,
            Command::Add => self.start_add(session).await,
            Command::Modify => self.send_modify_menu(session).await,
            Command::Delete => self.send_delete_menu(session).await,
            Command::List => self.send_device_list(session).await,
            Command::Cancel => self.cancel(session).await,
        }
    }

    async fn handle_selection(
        &mut self,
        session: SessionId,
        selection: Selection,
    ) -> Result<(), CoreError> {
        // The prompt that carried the button is spent; retract the
        // whole transient set before reacting.
        self.clear_prompts(session).await;

        match selection {
            Selection::WakeMenu => self.send_wake_menu(session).await,
            Selection::Wake(name) => self.wake_device(session, &name).await,
            Selection::StartAdd => self.start_add(session).await,
            Selection::ModifyMenu => self.send_modify_menu(session).await,
            Selection::ModifyDevice(name) => self.send_modify_options(session, &name).await,
            Selection::ModifyName(name) => {
                self.flows.insert(session, Flow::ModifyName { target: name.clone() });
                self.prompt(
                    session,
                    &format!("Enter the new name for {name}:"),
                    &[vec![cancel_button()]],
                )
                .await
            }
            Selection::ModifyMac(name) => {
                self.flows.insert(session, Flow::ModifyMac { target: name.clone() });
                self.prompt(
                    session,
                    &format!("Enter the new MAC address for {name} (format: {MAC_FORMAT_HINT}):"),
                    &[vec![cancel_button()]],
                )
                .await
            }
            Selection::DeleteMenu => self.send_delete_menu(session).await,
            Selection::Delete(name) => self.delete_device(session, &name).await,
            Selection::Cancel => self.cancel(session).await,
        }
    }

    // ── Free-text routing ────────────────────────────────────────────

    async fn handle_text(&mut self, session: SessionId, text: &str) -> Result<(), CoreError> {
        let text = text.trim();

        if let Some(flow) = self.flows.remove(&session) {
            return self.advance_flow(session, flow, text).await;
        }

        // Idle: an exact device name wakes immediately.
        if self.registry.find(text).is_some() {
            return self.wake_device(session, text).await;
        }

        if text.contains(',') {
            return self.quick_command(session, text).await;
        }

        // Bare text that is not a known device: delete-by-name.
        self.delete_device(session, text).await
    }

    /// One step of an in-progress flow. The flow entry has already been
    /// removed; states that survive the step re-insert themselves.
    async fn advance_flow(
        &mut self,
        session: SessionId,
        flow: Flow,
        text: &str,
    ) -> Result<(), CoreError> {
        match flow {
            Flow::AddAwaitingName => {
                self.flows
                    .insert(session, Flow::AddAwaitingMac { name: text.to_owned() });
                self.prompt(
                    session,
                    &format!(
                        "Device name set to: {text}\nPlease enter the MAC address (format: {MAC_FORMAT_HINT}):"
                    ),
                    &[vec![cancel_button()]],
                )
                .await
            }

            Flow::AddAwaitingMac { name } => self.finish_add(session, name, text).await,

            Flow::ModifyName { target } => {
                let result = self.registry.update(&target, Some(text), None);
                match outcome(result) {
                    Outcome::Applied(note) => {
                        self.refresh_keyboard(session).await?;
                        self.prompt(
                            session,
                            &format!(
                                "Device name updated from {target} to {text}\nWould you like to modify the MAC address as well?{note}"
                            ),
                            &[vec![
                                Button::new(
                                    "Modify MAC",
                                    Selection::ModifyMac(text.to_owned()).encode(),
                                ),
                                done_button(),
                            ]],
                        )
                        .await
                    }
                    Outcome::Rejected(err) => {
                        self.gateway
                            .send_text(session, &flow_rejection_text(&err))
                            .await
                    }
                }
            }

            Flow::ModifyMac { target } => {
                let Ok(mac) = MacAddress::parse(text) else {
                    // Hard cancel: the modify flow does not re-prompt.
                    return self
                        .gateway
                        .send_text(session, "Invalid MAC address format. Operation cancelled.")
                        .await;
                };
                let result = self.registry.update(&target, None, Some(&mac.to_string()));
                match outcome(result) {
                    Outcome::Applied(note) => {
                        self.refresh_keyboard(session).await?;
                        self.prompt(
                            session,
                            &format!(
                                "MAC address updated for {target}\nWould you like to modify the name as well?{note}"
                            ),
                            &[vec![
                                Button::new(
                                    "Modify Name",
                                    Selection::ModifyName(target.clone()).encode(),
                                ),
                                done_button(),
                            ]],
                        )
                        .await
                    }
                    Outcome::Rejected(err) => {
                        self.gateway
                            .send_text(session, &flow_rejection_text(&err))
                            .await
                    }
                }
            }
        }
    }

    /// Last step of the add flow. Invalid input re-prompts and keeps
    /// the flow alive; a duplicate name reports and drops it.
    async fn finish_add(
        &mut self,
        session: SessionId,
        name: String,
        text: &str,
    ) -> Result<(), CoreError> {
        let Ok(mac) = MacAddress::parse(text) else {
            self.flows.insert(session, Flow::AddAwaitingMac { name });
            return self
                .prompt(
                    session,
                    &format!(
                        "Invalid MAC address format. Please try again (format: {MAC_FORMAT_HINT}):"
                    ),
                    &[vec![cancel_button()]],
                )
                .await;
        };

        let result = self.registry.add(Device::new(name.clone(), mac.clone()));
        match outcome(result) {
            Outcome::Applied(note) => {
                let mut msg = format!("Device added successfully!\nName: {name}\nMAC: {mac}");
                msg.push_str(&note);
                self.gateway.send_text(session, &msg).await?;
                self.refresh_keyboard(session).await
            }
            Outcome::Rejected(err) => {
                self.gateway.send_text(session, &rejection_text(&err)).await
            }
        }
    }

    /// Comma-joined single-line command: `name,mac` adds, `old,new,mac`
    /// modifies. Anything else is malformed.
    async fn quick_command(&mut self, session: SessionId, text: &str) -> Result<(), CoreError> {
        let parts: Vec<&str> = text.split(',').map(str::trim).collect();
        match parts.as_slice() {
            [name, mac] if !name.is_empty() => {
                let Ok(mac) = MacAddress::parse(mac) else {
                    return self
                        .gateway
                        .send_text(session, "Invalid MAC address format.")
                        .await;
                };
                let result = self.registry.add(Device::new(*name, mac));
                match outcome(result) {
                    Outcome::Applied(note) => {
                        self.gateway
                            .send_text(session, &format!("Device added: {name}{note}"))
                            .await?;
                        self.refresh_keyboard(session).await
                    }
                    Outcome::Rejected(err) => {
                        self.gateway.send_text(session, &rejection_text(&err)).await
                    }
                }
            }
            [old_name, new_name, mac] if !new_name.is_empty() => {
                let result = self.registry.update(old_name, Some(new_name), Some(mac));
                match outcome(result) {
                    Outcome::Applied(note) => {
                        self.gateway
                            .send_text(session, &format!("Device modified: {new_name}{note}"))
                            .await?;
                        self.refresh_keyboard(session).await
                    }
                    Outcome::Rejected(err) => {
                        self.gateway.send_text(session, &rejection_text(&err)).await
                    }
                }
            }
            _ => self.gateway.send_text(session, "Invalid command format.").await,
        }
    }

    // ── Operations ───────────────────────────────────────────────────

    /// Resolve, encode, and transmit. Resolution happens here, at
    /// commit time, never against a stale prompt snapshot.
    async fn wake_device(&mut self, session: SessionId, name: &str) -> Result<(), CoreError> {
        let Some(device) = self.registry.find(name) else {
            return self.gateway.send_text(session, "Device not found.").await;
        };

        let packet = magic_packet(&device.mac);
        match self.sender.send(&packet).await {
            Ok(()) => {
                info!(device = name, mac = %device.mac, "wake packet sent");
                self.gateway
                    .send_text(session, &format!("WoL packet sent to {name}"))
                    .await
            }
            Err(e) => {
                warn!(device = name, error = %e, "wake packet failed");
                self.gateway
                    .send_text(session, "Failed to send WoL packet")
                    .await
            }
        }
    }

    async fn delete_device(&mut self, session: SessionId, name: &str) -> Result<(), CoreError> {
        let result = self.registry.delete(name);
        match outcome(result) {
            Outcome::Applied(note) => {
                self.gateway
                    .send_text(session, &format!("Device deleted: {name}{note}"))
                    .await?;
                self.refresh_keyboard(session).await
            }
            Outcome::Rejected(err) => {
                self.gateway.send_text(session, &rejection_text(&err)).await
            }
        }
    }

    async fn start_add(&mut self, session: SessionId) -> Result<(), CoreError> {
        self.flows.insert(session, Flow::AddAwaitingName);
        self.prompt(
            session,
            "Please enter the name for the new device:",
            &[vec![cancel_button()]],
        )
        .await
    }

    /// Unconditionally clear pending state. Valid when idle (no-op).
    async fn cancel(&mut self, session: SessionId) -> Result<(), CoreError> {
        self.flows.remove(&session);
        self.clear_prompts(session).await;
        self.gateway.send_text(session, "Operation cancelled").await
    }

    // ── Menus ────────────────────────────────────────────────────────

    async fn send_help(&mut self, session: SessionId) -> Result<(), CoreError> {
        let help = "🖥 WOL Device Manager\n\n\
            Available Commands:\n\
            /help - Show this help message\n\
            /wol - Wake up a device\n\
            /add - Add a new device\n\
            /modify - Modify existing device\n\
            /delete - Delete a device\n\
            /list - List all saved devices\n\n\
            Quick wake: tap a device name on the keyboard below, or just type it.\n\
            Quick add: send `name,mac`. Quick modify: send `old name,new name,new mac`.\n\n\
            MAC Address Format: XX:XX:XX:XX:XX:XX";
        let rows = vec![
            vec![
                Button::new("💻 Wake Device", Selection::WakeMenu.encode()),
                Button::new("➕ Add Device", Selection::StartAdd.encode()),
            ],
            vec![
                Button::new("✏️ Modify Device", Selection::ModifyMenu.encode()),
                Button::new("❌ Delete Device", Selection::DeleteMenu.encode()),
            ],
        ];
        self.prompt(session, help, &rows).await
    }

    async fn send_device_list(&mut self, session: SessionId) -> Result<(), CoreError> {
        if self.registry.list().is_empty() {
            return self.gateway.send_text(session, "No devices found.").await;
        }
        let mut listing = String::from("Saved Devices:\n\n");
        for device in self.registry.list() {
            listing.push_str(&format!("📱 {}\nMAC: {}\n\n", device.name, device.mac));
        }
        self.gateway.send_text(session, &listing).await
    }

    async fn send_wake_menu(&mut self, session: SessionId) -> Result<(), CoreError> {
        let rows = self.device_rows(Selection::Wake);
        self.prompt(session, "Select a device to wake up:", &rows).await
    }

    async fn send_modify_menu(&mut self, session: SessionId) -> Result<(), CoreError> {
        let rows = self.device_rows(Selection::ModifyDevice);
        self.prompt(session, "Select a device to modify:", &rows).await
    }

    async fn send_delete_menu(&mut self, session: SessionId) -> Result<(), CoreError> {
        let rows = self.device_rows(Selection::Delete);
        self.prompt(session, "Select a device to delete:", &rows).await
    }

    async fn send_modify_options(
        &mut self,
        session: SessionId,
        name: &str,
    ) -> Result<(), CoreError> {
        let rows = vec![
            vec![
                Button::new("Modify Name", Selection::ModifyName(name.to_owned()).encode()),
                Button::new("Modify MAC", Selection::ModifyMac(name.to_owned()).encode()),
            ],
            vec![cancel_button()],
        ];
        self.prompt(
            session,
            &format!("What would you like to modify for {name}?"),
            &rows,
        )
        .await
    }

    /// One button per device plus a cancel row. The names captured here
    /// are a prompt-time snapshot; commit-time code re-resolves them.
    fn device_rows(&self, select: impl Fn(String) -> Selection) -> Vec<Vec<Button>> {
        let mut rows: Vec<Vec<Button>> = self
            .registry
            .list()
            .iter()
            .map(|d| vec![Button::new(d.name.clone(), select(d.name.clone()).encode())])
            .collect();
        rows.push(vec![cancel_button()]);
        rows
    }

    // ── Prompt bookkeeping ───────────────────────────────────────────

    /// Retract every tracked transient prompt, then show a new one and
    /// track it.
    async fn prompt(
        &mut self,
        session: SessionId,
        text: &str,
        rows: &[Vec<Button>],
    ) -> Result<(), CoreError> {
        self.clear_prompts(session).await;
        let id = self.gateway.send_menu(session, text, rows).await?;
        self.prompts.entry(session).or_default().push(id);
        Ok(())
    }

    async fn clear_prompts(&mut self, session: SessionId) {
        let Some(ids) = self.prompts.remove(&session) else {
            return;
        };
        for id in ids {
            // Best effort: the message may already be gone.
            if let Err(e) = self.gateway.retract(session, id).await {
                warn!(session = %session, error = %e, "failed to retract prompt");
            }
        }
    }

    async fn refresh_keyboard(&mut self, session: SessionId) -> Result<(), CoreError> {
        let names: Vec<String> =
            self.registry.list().iter().map(|d| d.name.clone()).collect();
        self.gateway.refresh_keyboard(session, &names).await
    }
}

// ── Mutation outcome mapping ────────────────────────────────────────

enum Outcome {
    /// The in-memory mutation happened. The string is an empty or
    /// warning suffix for the success message (persist failures keep
    /// the mutation but must be surfaced).
    Applied(String),
    Rejected(CoreError),
}

fn outcome(result: Result<(), CoreError>) -> Outcome {
    match result {
        Ok(()) => Outcome::Applied(String::new()),
        Err(CoreError::Persistence { reason }) => {
            warn!(reason = %reason, "registry persist failed, in-memory state kept");
            Outcome::Applied(format!("\nWarning: saving the registry failed: {reason}"))
        }
        Err(err) => Outcome::Rejected(err),
    }
}

fn rejection_text(err: &CoreError) -> String {
    match err {
        CoreError::NotFound { .. } => "Device not found.".into(),
        CoreError::InvalidMac { .. } => "Invalid MAC address format.".into(),
        CoreError::EmptyName => "Device name cannot be empty.".into(),
        CoreError::DuplicateName { name } => {
            format!("A device named {name} already exists.")
        }
        other => other.to_string(),
    }
}

/// Rejections inside a modify flow abort it, so the vanished-target
/// notice carries the cancellation.
fn flow_rejection_text(err: &CoreError) -> String {
    match err {
        CoreError::NotFound { .. } => "Device not found. Operation cancelled.".into(),
        other => rejection_text(other),
    }
}

fn cancel_button() -> Button {
    Button::new("❌ Cancel", Selection::Cancel.encode())
}

fn done_button() -> Button {
    Button::new("❌ Done", Selection::Cancel.encode())
}
