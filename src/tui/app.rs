use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::collections::VecDeque;

use crate::core::{
    Controller, CustomCommandKind, DeviceForm, Notice, QueryKind, UpsertOutcome,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Devices,
    Log,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    StartSerial,
    StartTcpServer,
    StopConnections,
    ShowDevices,
    ShowLog,
    SaveConfiguration,
    Quit,
    AddDevice,
    RemoveDevice,
    Query(QueryKind),
    Custom(CustomCommandKind),
}

pub struct Menu {
    pub title: &'static str,
    pub items: Vec<(String, MenuAction)>,
}

pub fn menus() -> Vec<Menu> {
    vec![
        Menu {
            title: "System",
            items: vec![
                ("Start Serial Connection".to_string(), MenuAction::StartSerial),
                ("Start TCP Server Connection".to_string(), MenuAction::StartTcpServer),
                ("Stop Connections".to_string(), MenuAction::StopConnections),
                ("Show Devices".to_string(), MenuAction::ShowDevices),
                ("Show Log".to_string(), MenuAction::ShowLog),
                ("Save Configuration".to_string(), MenuAction::SaveConfiguration),
                ("Quit".to_string(), MenuAction::Quit),
            ],
        },
        Menu {
            title: "Devices",
            items: vec![
                ("Add".to_string(), MenuAction::AddDevice),
                ("Remove".to_string(), MenuAction::RemoveDevice),
            ],
        },
        Menu {
            title: "Commands",
            items: QueryKind::all()
                .into_iter()
                .map(|kind| (kind.to_string(), MenuAction::Query(kind)))
                .collect(),
        },
        Menu {
            title: "Invalid Commands",
            items: CustomCommandKind::all()
                .into_iter()
                .map(|kind| (kind.to_string(), MenuAction::Custom(kind)))
                .collect(),
        },
    ]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Toggle(bool),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub label: &'static str,
    pub value: FieldValue,
}

impl Field {
    fn text(label: &'static str, value: impl Into<String>) -> Self {
        Self {
            label,
            value: FieldValue::Text(value.into()),
        }
    }

    fn toggle(label: &'static str, value: bool) -> Self {
        Self {
            label,
            value: FieldValue::Toggle(value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    StartSerial,
    StartTcpServer,
    AddDevice,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Form {
    pub kind: FormKind,
    pub title: &'static str,
    pub fields: Vec<Field>,
    pub focus: usize,
}

impl Form {
    fn text(&self, index: usize) -> &str {
        match self.fields.get(index).map(|field| &field.value) {
            Some(FieldValue::Text(text)) => text,
            _ => "",
        }
    }

    fn toggle(&self, index: usize) -> bool {
        matches!(
            self.fields.get(index).map(|field| &field.value),
            Some(FieldValue::Toggle(true))
        )
    }

    fn device_form(&self) -> DeviceForm {
        DeviceForm {
            name: self.text(0).to_string(),
            address: self.text(1).to_string(),
            use_crc: self.toggle(2),
            use_secure_channel: self.toggle(3),
            secure_channel_key: self.text(4).to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickPurpose {
    Remove,
    Query(QueryKind),
    Custom(CustomCommandKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Picker {
    pub title: String,
    pub purpose: PickPurpose,
    pub entries: Vec<(u8, String)>,
    pub selected: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmAction {
    /// Replace the device entered in the held Add Device form; declining
    /// reopens that form.
    Overwrite(Form),
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirm {
    pub title: &'static str,
    pub message: &'static str,
    pub action: ConfirmAction,
    pub yes_selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Overlay {
    Menu { index: usize, item: usize },
    Form(Form),
    Picker(Picker),
    Confirm(Confirm),
}

pub struct App {
    pub menus: Vec<Menu>,
    pub view: View,
    pub overlay: Option<Overlay>,
    pub notices: VecDeque<Notice>,
    pub status_line: String,
    pub log_scroll: u16,
    pub should_quit: bool,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    pub fn new() -> Self {
        Self {
            menus: menus(),
            view: View::Devices,
            overlay: None,
            notices: VecDeque::new(),
            status_line: String::new(),
            log_scroll: 0,
            should_quit: false,
        }
    }

    pub fn push_notice(&mut self, notice: Notice) {
        self.notices.push_back(notice);
    }

    fn fail(&mut self, err: anyhow::Error) {
        self.push_notice(Notice::error("Error", format!("{err:#}")));
    }

    pub fn handle_key(&mut self, key: KeyEvent, controller: &mut Controller) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        // Notices sit on top of everything and are dismissed first.
        if !self.notices.is_empty() {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
                self.notices.pop_front();
            }
            return;
        }

        match self.overlay.take() {
            None => self.handle_base_key(key),
            Some(Overlay::Menu { index, item }) => self.handle_menu_key(key, index, item, controller),
            Some(Overlay::Form(form)) => self.handle_form_key(key, form, controller),
            Some(Overlay::Picker(picker)) => self.handle_picker_key(key, picker, controller),
            Some(Overlay::Confirm(confirm)) => self.handle_confirm_key(key, confirm, controller),
        }
    }

    fn handle_base_key(&mut self, key: KeyEvent) {
        let open = |index: usize| Some(Overlay::Menu { index, item: 0 });
        match key.code {
            KeyCode::F(10) | KeyCode::Enter | KeyCode::Char('s') => self.overlay = open(0),
            KeyCode::Char('d') => self.overlay = open(1),
            KeyCode::Char('c') => self.overlay = open(2),
            KeyCode::Char('i') => self.overlay = open(3),
            KeyCode::Char('l') => self.view = View::Log,
            KeyCode::Char('v') => self.view = View::Devices,
            KeyCode::Char('q') => self.overlay = Some(Overlay::Confirm(quit_confirm())),
            KeyCode::Up => self.log_scroll = self.log_scroll.saturating_sub(1),
            KeyCode::Down => self.log_scroll = self.log_scroll.saturating_add(1),
            _ => {}
        }
    }

    fn handle_menu_key(
        &mut self,
        key: KeyEvent,
        index: usize,
        item: usize,
        controller: &mut Controller,
    ) {
        let menu_count = self.menus.len();
        let item_count = self.menus[index].items.len();
        let next = match key.code {
            KeyCode::Esc => return,
            KeyCode::Left => Overlay::Menu {
                index: (index + menu_count - 1) % menu_count,
                item: 0,
            },
            KeyCode::Right | KeyCode::Tab => Overlay::Menu {
                index: (index + 1) % menu_count,
                item: 0,
            },
            KeyCode::Up => Overlay::Menu {
                index,
                item: (item + item_count - 1) % item_count,
            },
            KeyCode::Down => Overlay::Menu {
                index,
                item: (item + 1) % item_count,
            },
            KeyCode::Enter => {
                let action = self.menus[index].items[item].1;
                self.run_action(action, controller);
                return;
            }
            _ => Overlay::Menu { index, item },
        };
        self.overlay = Some(next);
    }

    pub fn run_action(&mut self, action: MenuAction, controller: &mut Controller) {
        match action {
            MenuAction::StartSerial => {
                let serial = &controller.settings().serial_connection_settings;
                self.overlay = Some(Overlay::Form(Form {
                    kind: FormKind::StartSerial,
                    title: "Start Serial Connection",
                    fields: vec![
                        Field::text("Port", serial.port_name.as_str()),
                        Field::text("Baud Rate", serial.baud_rate.to_string()),
                    ],
                    focus: 0,
                }))
            }
            MenuAction::StartTcpServer => {
                let tcp = &controller.settings().tcp_server_connection_settings;
                self.overlay = Some(Overlay::Form(Form {
                    kind: FormKind::StartTcpServer,
                    title: "Start TCP Server Connection",
                    fields: vec![
                        Field::text("Port Number", tcp.port_number.to_string()),
                        Field::text("Baud Rate", tcp.baud_rate.to_string()),
                    ],
                    focus: 0,
                }))
            }
            MenuAction::StopConnections => {
                controller.stop_connections();
                self.status_line = "Connections stopped".to_string();
            }
            MenuAction::ShowDevices => self.view = View::Devices,
            MenuAction::ShowLog => {
                self.view = View::Log;
                self.log_scroll = 0;
            }
            MenuAction::SaveConfiguration => {
                self.status_line = if controller.save_configuration() {
                    "Configuration saved".to_string()
                } else {
                    "Configuration could not be saved (see log)".to_string()
                };
            }
            MenuAction::Quit => self.overlay = Some(Overlay::Confirm(quit_confirm())),
            MenuAction::AddDevice => {
                self.overlay = Some(Overlay::Form(Form {
                    kind: FormKind::AddDevice,
                    title: "Add Device",
                    fields: vec![
                        Field::text("Name", ""),
                        Field::text("Address", ""),
                        Field::toggle("Use CRC", true),
                        Field::toggle("Use Secure Channel", true),
                        Field::text("Secure Channel Key", ""),
                    ],
                    focus: 0,
                }))
            }
            MenuAction::RemoveDevice => self.open_picker("Remove Device", PickPurpose::Remove, controller),
            MenuAction::Query(kind) => {
                self.open_picker(&kind.to_string(), PickPurpose::Query(kind), controller)
            }
            MenuAction::Custom(kind) => {
                self.open_picker(&kind.to_string(), PickPurpose::Custom(kind), controller)
            }
        }
    }

    fn open_picker(&mut self, title: &str, purpose: PickPurpose, controller: &Controller) {
        let entries: Vec<(u8, String)> = controller
            .registry()
            .list()
            .into_iter()
            .map(|device| (device.address, device.label()))
            .collect();
        if entries.is_empty() {
            self.push_notice(Notice::error(title, "No devices have been added"));
            return;
        }
        self.overlay = Some(Overlay::Picker(Picker {
            title: title.to_string(),
            purpose,
            entries,
            selected: 0,
        }));
    }

    fn handle_form_key(&mut self, key: KeyEvent, mut form: Form, controller: &mut Controller) {
        let count = form.fields.len();
        match key.code {
            KeyCode::Esc => return,
            KeyCode::Tab | KeyCode::Down => form.focus = (form.focus + 1) % count,
            KeyCode::BackTab | KeyCode::Up => form.focus = (form.focus + count - 1) % count,
            KeyCode::Enter => {
                self.submit_form(form, controller);
                return;
            }
            KeyCode::Backspace => {
                if let FieldValue::Text(text) = &mut form.fields[form.focus].value {
                    text.pop();
                }
            }
            KeyCode::Char(ch) => match &mut form.fields[form.focus].value {
                FieldValue::Text(text) => text.push(ch),
                FieldValue::Toggle(value) if ch == ' ' => *value = !*value,
                FieldValue::Toggle(_) => {}
            },
            _ => {}
        }
        self.overlay = Some(Overlay::Form(form));
    }

    fn submit_form(&mut self, form: Form, controller: &mut Controller) {
        let result = match form.kind {
            FormKind::StartSerial => controller
                .start_serial_connection(form.text(0), form.text(1))
                .map(|session| format!("Serial connection {session} started")),
            FormKind::StartTcpServer => controller
                .start_tcp_server_connection(form.text(0), form.text(1))
                .map(|session| format!("TCP server connection {session} started")),
            FormKind::AddDevice => {
                let device_form = form.device_form();
                let address = match device_form.parse() {
                    Ok(entry) => entry.address,
                    Err(err) => {
                        self.overlay = Some(Overlay::Form(form));
                        self.fail(err.into());
                        return;
                    }
                };
                if controller.registry().contains(address) {
                    self.overlay = Some(Overlay::Confirm(Confirm {
                        title: "Overwrite",
                        message: "Device already exists at that address, overwrite?",
                        action: ConfirmAction::Overwrite(form),
                        yes_selected: true,
                    }));
                    return;
                }
                controller
                    .add_device(&device_form, |_| true)
                    .map(|_| format!("Device added at address {address}"))
            }
        };

        match result {
            Ok(status) => self.status_line = status,
            Err(err) => {
                // Keep the dialog open so the operator can correct the input.
                self.overlay = Some(Overlay::Form(form));
                self.fail(err);
            }
        }
    }

    fn handle_picker_key(&mut self, key: KeyEvent, mut picker: Picker, controller: &mut Controller) {
        let count = picker.entries.len();
        match key.code {
            KeyCode::Esc => return,
            KeyCode::Up => picker.selected = (picker.selected + count - 1) % count,
            KeyCode::Down | KeyCode::Tab => picker.selected = (picker.selected + 1) % count,
            KeyCode::Enter => {
                let address = picker.entries[picker.selected].0;
                match picker.purpose {
                    PickPurpose::Remove => match controller.remove_device(address) {
                        Ok(_) => self.status_line = format!("Device at address {address} removed"),
                        Err(err) => self.fail(err),
                    },
                    PickPurpose::Query(kind) => {
                        if controller.send_query(kind, address).is_some() {
                            self.status_line = format!("{kind} sent to address {address}");
                        }
                    }
                    PickPurpose::Custom(kind) => {
                        if controller.send_custom_command(kind, address).is_some() {
                            self.status_line = format!("{kind} sent to address {address}");
                        }
                    }
                }
                return;
            }
            _ => {}
        }
        self.overlay = Some(Overlay::Picker(picker));
    }

    fn handle_confirm_key(&mut self, key: KeyEvent, mut confirm: Confirm, controller: &mut Controller) {
        let accepted = match key.code {
            KeyCode::Left | KeyCode::Right | KeyCode::Tab => {
                confirm.yes_selected = !confirm.yes_selected;
                self.overlay = Some(Overlay::Confirm(confirm));
                return;
            }
            KeyCode::Char('y') | KeyCode::Char('Y') => true,
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => false,
            KeyCode::Enter => confirm.yes_selected,
            _ => {
                self.overlay = Some(Overlay::Confirm(confirm));
                return;
            }
        };

        match confirm.action {
            ConfirmAction::Quit => self.should_quit = accepted,
            ConfirmAction::Overwrite(form) => {
                let device_form = form.device_form();
                match controller.add_device(&device_form, |_| accepted) {
                    Ok(UpsertOutcome::Declined) => {
                        self.overlay = Some(Overlay::Form(form));
                        self.status_line = "Existing device kept".to_string()
                    }
                    Ok(_) => {
                        self.status_line =
                            format!("Device at address {} replaced", device_form.address.trim())
                    }
                    Err(err) => self.fail(err),
                }
            }
        }
    }
}

fn quit_confirm() -> Confirm {
    Confirm {
        title: "Quit",
        message: "Quit program?",
        action: ConfirmAction::Quit,
        yes_selected: true,
    }
}
