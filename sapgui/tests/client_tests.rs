use anyhow::Result;
use sapgui::platforms::memory::{MemoryHost, NodeId};
use sapgui::{
    Component, Locator, SapClient, SapError, SessionConfig, SessionContext, SessionState,
};
use std::sync::Arc;
use std::time::Duration;

fn quick_config() -> SessionConfig {
    SessionConfig {
        login_settle: Duration::from_millis(1),
        navigation_settle: Duration::from_millis(1),
        poll_interval: Duration::from_millis(1),
        action_timeout: Duration::from_millis(50),
        open_retry_delay: Duration::from_millis(1),
        ..SessionConfig::default()
    }
}

fn client_for(host: &MemoryHost) -> SapClient {
    let context = SessionContext::new(Arc::new(host.clone()))
        .with_config(quick_config())
        .expect("valid config");
    SapClient::new(context)
}

struct Screen {
    host: MemoryHost,
    session: NodeId,
    window: NodeId,
    status: NodeId,
}

fn easy_access() -> Screen {
    let host = MemoryHost::new();
    let session = host.add_session();
    let window = host.add_component(session, "wnd[0]", "GuiMainWindow");
    host.set_property(window, "Text", "SAP Easy Access");
    host.set_active_window(session, window);
    for (path, tag) in [
        ("wnd[0]/usr/txtRSYST-BNAME", "GuiTextField"),
        ("wnd[0]/usr/pwdRSYST-BCODE", "GuiPasswordField"),
        ("wnd[0]/usr/txtRSYST-MANDT", "GuiTextField"),
        ("wnd[0]/usr/txtRSYST-LANGU", "GuiTextField"),
        ("wnd[0]/okcd", "GuiCTextField"),
        ("wnd[0]/usr/ctxtVBAK-AUART", "GuiCTextField"),
        ("wnd[0]/tbar[1]/btn[8]", "GuiButton"),
        ("wnd[0]/usr/chkP_TEST", "GuiCheckBox"),
    ] {
        host.add_component(session, path, tag);
    }
    let status = host.add_component(session, "wnd[0]/sbar", "GuiStatusbar");
    Screen {
        host,
        session,
        window,
        status,
    }
}

#[test]
fn open_login_and_navigate() -> Result<()> {
    let screen = easy_access();
    let mut client = client_for(&screen.host);

    let window = client.open()?;
    assert_eq!(window.text()?, "SAP Easy Access");

    client.login("DEVELOPER", "s3cret", "001", "EN")?;
    assert_eq!(client.state(), SessionState::LoggedIn);

    client.go_to_transaction("VA01")?;
    let okcd = client
        .find_text_field_by_id("wnd[0]/okcd")?
        .expect("command field");
    assert_eq!(okcd.text()?, "/nVA01");
    Ok(())
}

#[test]
fn open_fails_after_one_retry_without_connections() {
    let host = MemoryHost::new();
    let mut client = client_for(&host);

    match client.open() {
        Err(SapError::SessionNotEstablished(_)) => {}
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(client.state(), SessionState::Closed);
}

#[test]
fn typed_finders_return_none_for_other_variants() -> Result<()> {
    let screen = easy_access();
    let mut client = client_for(&screen.host);
    client.open()?;

    assert!(client.find_button_by_id("wnd[0]/tbar[1]/btn[8]")?.is_some());
    assert!(client.find_button_by_id("wnd[0]/usr/chkP_TEST")?.is_none());
    assert!(client.find_checkbox_by_id("wnd[0]/usr/chkP_TEST")?.is_some());
    assert!(client.find_grid_view_by_id("wnd[0]/usr/chkP_TEST")?.is_none());
    assert!(client.find_component_by_id("wnd[0]/usr/missing")?.is_none());

    let component = client
        .find_component_by_id("wnd[0]/usr/ctxtVBAK-AUART")?
        .expect("order type field");
    assert_eq!(component.type_tag(), "GuiCTextField");
    Ok(())
}

#[test]
fn actions_on_missing_elements_are_element_not_found() -> Result<()> {
    let screen = easy_access();
    let mut client = client_for(&screen.host);
    client.open()?;

    assert!(matches!(
        client.set_text_field_value("wnd[0]/usr/txtNOPE", "x"),
        Err(SapError::ElementNotFound(_))
    ));
    assert!(matches!(
        client.click_button("wnd[0]/tbar[1]/btn[99]"),
        Err(SapError::ElementNotFound(_))
    ));
    // Resolves, but to a checkbox rather than a grid.
    assert!(matches!(
        client.get_grid_data("wnd[0]/usr/chkP_TEST"),
        Err(SapError::ElementNotFound(_))
    ));
    Ok(())
}

#[test]
fn set_text_and_click() -> Result<()> {
    let screen = easy_access();
    let mut client = client_for(&screen.host);
    client.open()?;

    client.set_text_field_value("wnd[0]/usr/ctxtVBAK-AUART", "OR")?;
    client.click_button("wnd[0]/tbar[1]/btn[8]")?;

    let field = client
        .find_text_field_by_id("wnd[0]/usr/ctxtVBAK-AUART")?
        .expect("order type field");
    assert_eq!(field.text()?, "OR");
    Ok(())
}

#[test]
fn status_bar_text_never_fails() -> Result<()> {
    let screen = easy_access();
    let mut client = client_for(&screen.host);

    // No session at all.
    assert_eq!(client.get_status_bar_text(), "");

    client.open()?;
    screen
        .host
        .set_property(screen.status, "Text", "Document 4711 saved");
    screen.host.set_property(screen.status, "MessageType", "S");
    assert_eq!(client.get_status_bar_text(), "Document 4711 saved");

    screen.host.set_unreachable(Some("RPC server is unavailable"));
    assert_eq!(client.get_status_bar_text(), "");
    Ok(())
}

#[test]
fn grid_snapshot_through_client() -> Result<()> {
    let screen = easy_access();
    let grid = screen.host.add_component(
        screen.session,
        "wnd[0]/usr/cntlGRID1/shellcont/shell",
        "GuiGridView",
    );
    screen.host.set_grid(
        grid,
        &[("VBELN", "Sales Doc."), ("KUNNR", ""), ("KUNNR", "")],
        &[vec!["4711", "C100", "C200"], vec!["4712", "C101", "C201"]],
    );
    let mut client = client_for(&screen.host);
    client.open()?;

    let table = client.get_grid_data("wnd[0]/usr/cntlGRID1/shellcont/shell")?;
    assert_eq!(table.columns, ["Sales Doc.", "KUNNR", "KUNNR_1"]);
    assert_eq!(table.row_count(), 2);
    assert_eq!(table.cell(1, "Sales Doc."), Some("4712"));

    let json = serde_json::to_value(&table)?;
    assert_eq!(json["columns"][2], "KUNNR_1");
    assert_eq!(table.to_json()[0]["KUNNR_1"], "C200");
    Ok(())
}

#[test]
fn send_virtual_key_needs_a_main_window() -> Result<()> {
    let screen = easy_access();
    let mut client = client_for(&screen.host);

    assert!(matches!(
        client.send_virtual_key(3),
        Err(SapError::SessionNotEstablished(_))
    ));

    client.open()?;
    client.send_virtual_key(3)?;
    let calls = screen.host.calls_named(screen.window, "SendVKey");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].args[0].as_i64("SendVKey")?, 3);
    Ok(())
}

#[test]
fn main_window_requires_open() -> Result<()> {
    let screen = easy_access();
    let mut client = client_for(&screen.host);
    assert!(client.main_window().is_err());

    client.open()?;
    let main = client.main_window()?;
    let path = Locator::resolve_relative(&main.id()?, "sbar");
    assert_eq!(path, "/app/con[0]/ses[0]/wnd[0]/sbar");
    Ok(())
}

#[test]
fn dispose_releases_the_session_once() -> Result<()> {
    let screen = easy_access();
    let mut client = client_for(&screen.host);
    client.open()?;

    client.dispose();
    client.dispose();
    assert!(matches!(client.open(), Err(SapError::Disposed)));
    drop(client);

    assert_eq!(screen.host.releases(screen.session), 1);
    Ok(())
}

#[test]
fn dropping_the_client_releases_the_session() -> Result<()> {
    let screen = easy_access();
    {
        let mut client = client_for(&screen.host);
        client.open()?;
        client.close()?;
        client.open()?;
    }
    // One release per open.
    assert_eq!(screen.host.releases(screen.session), 2);
    Ok(())
}
