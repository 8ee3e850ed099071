pub mod synthetic_panel;
