pub mod app;
mod classify;
mod commands;
mod config;
mod context;
mod dispatch;
mod env;
mod info;
mod instances;
mod output;
mod runtime;
mod simulate;
