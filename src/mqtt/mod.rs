mod client;
pub use client::MessageBus;
pub use client::MqttBus;

mod publisher;
pub use publisher::Publisher;
