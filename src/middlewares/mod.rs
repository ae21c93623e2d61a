pub mod session_mw;
