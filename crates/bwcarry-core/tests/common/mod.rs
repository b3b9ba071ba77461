pub mod panel_server;
