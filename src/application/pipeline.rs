// Sample pipeline - rolling channel buffers plus the sample index
use crate::domain::rolling_buffer::RollingBuffer;
use crate::domain::telemetry::{Channel, Sample};

#[derive(Debug, Clone)]
pub struct SamplePipeline {
    velocity: RollingBuffer,
    acceleration: RollingBuffer,
    position: RollingBuffer,
    index: u64,
}

impl SamplePipeline {
    pub fn new(capacity: usize) -> Self {
        Self {
            velocity: RollingBuffer::new(capacity),
            acceleration: RollingBuffer::new(capacity),
            position: RollingBuffer::new(capacity),
            index: 0,
        }
    }

    /// Push one sample into every channel and return the new sample index.
    pub fn append(&mut self, sample: &Sample) -> u64 {
        self.velocity.push(sample.velocity);
        self.acceleration.push(sample.acceleration);
        self.position.push(sample.position);
        self.index += 1;
        self.index
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn capacity(&self) -> usize {
        self.velocity.len()
    }

    pub fn buffer(&self, channel: Channel) -> &RollingBuffer {
        match channel {
            Channel::Velocity => &self.velocity,
            Channel::Acceleration => &self.acceleration,
            Channel::Position => &self.position,
        }
    }
}
