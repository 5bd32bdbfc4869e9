pub mod checkpoint;
pub mod network;

pub use network::NeuralNetwork;
