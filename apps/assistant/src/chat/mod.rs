// Chat: context building and streaming response assembly for the resume assistant.

pub mod assembler;
pub mod context;
pub mod prompts;
