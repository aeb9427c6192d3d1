mod code_actions;
mod diagnostics;
mod lifecycle;
