pub mod webhook_call;
