use std::io::{Read, Write};
use std::time::Duration;

use async_trait::async_trait;
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};

use super::PressureSource;
use crate::error::VacuumError;
use crate::protocol::{Channel, RawCode, build_command, raw_code_from_reply};

/// Default baud rate of the vacuum sensor board
pub const DEFAULT_BAUD_RATE: u32 = 19200;

const WRITE_TIMEOUT: Duration = Duration::from_millis(100);
const REPLY_TIMEOUT: Duration = Duration::from_millis(200);
const DRAIN_TIMEOUT: Duration = Duration::from_millis(20);

/// Pressure source talking to the sensor board over a serial port
pub struct SerialPressureSource {
    port_name: Option<String>,
    baud_rate: u32,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialPressureSource {
    pub fn new(port_name: Option<String>, baud_rate: u32) -> Self {
        Self {
            port_name,
            baud_rate,
            port: None,
        }
    }

    /// List available serial ports (helper for CLI and API)
    pub fn list_available_ports() -> Result<Vec<serialport::SerialPortInfo>, VacuumError> {
        serialport::available_ports().map_err(VacuumError::SerialPort)
    }

    fn open(name: &str, baud_rate: u32) -> Result<Box<dyn SerialPort>, VacuumError> {
        let port = serialport::new(name, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(REPLY_TIMEOUT)
            .open()?;

        tracing::info!("Connected to {} at {} baud", name, baud_rate);
        Ok(port)
    }

    /// Try every port that looks like a USB or COM adapter
    fn auto_connect(baud_rate: u32) -> Result<(String, Box<dyn SerialPort>), VacuumError> {
        for info in Self::list_available_ports()? {
            if !looks_like_adapter(&info.port_name) {
                continue;
            }

            tracing::debug!("Auto-connect trying {}", info.port_name);
            match Self::open(&info.port_name, baud_rate) {
                Ok(port) => return Ok((info.port_name, port)),
                Err(e) => tracing::warn!("Failed to open {}: {}", info.port_name, e),
            }
        }

        Err(VacuumError::DataSource(
            "Auto-connect failed: no usable serial port".into(),
        ))
    }
}

/// Human-readable port type for listings
pub fn describe_port_type(port_type: &serialport::SerialPortType) -> String {
    match port_type {
        serialport::SerialPortType::UsbPort(info) => {
            format!(
                "USB - {}",
                info.product.as_deref().unwrap_or("Unknown")
            )
        }
        serialport::SerialPortType::BluetoothPort => "Bluetooth".to_string(),
        serialport::SerialPortType::PciPort => "PCI".to_string(),
        serialport::SerialPortType::Unknown => "Unknown".to_string(),
    }
}

fn looks_like_adapter(port_name: &str) -> bool {
    let upper = port_name.to_uppercase();
    upper.contains("USB") || upper.contains("COM")
}

/// Send one command frame and collect the reply bytes
fn exchange(port: &mut dyn SerialPort, channel: Channel) -> Result<Vec<u8>, VacuumError> {
    let command = build_command(channel);

    port.set_timeout(WRITE_TIMEOUT)?;
    port.write_all(&command)?;
    port.flush()?;
    tracing::trace!("Sent command {:?}", command);

    let mut reply = Vec::new();
    let mut buf = [0u8; 64];

    port.set_timeout(REPLY_TIMEOUT)?;
    match port.read(&mut buf) {
        Ok(n) => reply.extend_from_slice(&buf[..n]),
        Err(ref e) if e.kind() == std::io::ErrorKind::TimedOut => return Ok(reply),
        Err(e) => return Err(e.into()),
    }

    // Drain whatever follows the first chunk
    port.set_timeout(DRAIN_TIMEOUT)?;
    loop {
        match port.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => reply.extend_from_slice(&buf[..n]),
            Err(ref e) if e.kind() == std::io::ErrorKind::TimedOut => break,
            Err(e) => return Err(e.into()),
        }
    }

    tracing::trace!("Received bytes {:02x?}", reply);
    Ok(reply)
}

#[async_trait]
impl PressureSource for SerialPressureSource {
    async fn connect(&mut self, target: Option<String>) -> Result<(), VacuumError> {
        // Close any previous port first
        self.port = None;

        let baud_rate = self.baud_rate;
        let requested = target.or_else(|| self.port_name.clone());

        let (name, port) = tokio::task::spawn_blocking(move || match requested {
            Some(name) => Self::open(&name, baud_rate).map(|port| (name, port)),
            None => Self::auto_connect(baud_rate),
        })
        .await
        .map_err(|e| VacuumError::DataSource(format!("Connect task failed: {}", e)))??;

        self.port_name = Some(name);
        self.port = Some(port);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), VacuumError> {
        if self.port.take().is_some() {
            tracing::info!("Disconnected from {}", self.name());
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.port.is_some()
    }

    async fn measure_once(&mut self, channel: Channel) -> Result<RawCode, VacuumError> {
        let mut port = self.port.take().ok_or(VacuumError::NotConnected)?;

        // The port is moved into the blocking task and handed back afterwards
        let (port, reply) = tokio::task::spawn_blocking(move || {
            let reply = exchange(port.as_mut(), channel);
            (port, reply)
        })
        .await
        .map_err(|e| VacuumError::DataSource(format!("Serial task failed: {}", e)))?;

        self.port = Some(port);

        let reply = reply?;
        let raw = raw_code_from_reply(&reply).map_err(|_| VacuumError::NoResponse(channel))?;

        tracing::debug!("{} raw code {}", channel, raw);
        Ok(raw)
    }

    fn name(&self) -> &str {
        self.port_name.as_deref().unwrap_or("serial (auto)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_source_creation_windows_style() {
        let source = SerialPressureSource::new(Some("COM4".to_string()), DEFAULT_BAUD_RATE);
        assert_eq!(source.name(), "COM4");
        assert_eq!(source.baud_rate, 19200);
        assert!(!source.is_connected());
    }

    #[test]
    fn test_serial_source_creation_auto() {
        let source = SerialPressureSource::new(None, DEFAULT_BAUD_RATE);
        assert_eq!(source.name(), "serial (auto)");
        assert!(!source.is_connected());
    }

    #[test]
    fn test_looks_like_adapter() {
        assert!(looks_like_adapter("/dev/ttyUSB0"));
        assert!(looks_like_adapter("COM3"));
        assert!(looks_like_adapter("/dev/cu.usbserial-1410"));
        assert!(!looks_like_adapter("/dev/ttyS0"));
    }

    #[test]
    fn test_describe_port_type() {
        assert_eq!(
            describe_port_type(&serialport::SerialPortType::PciPort),
            "PCI"
        );
        assert_eq!(
            describe_port_type(&serialport::SerialPortType::Unknown),
            "Unknown"
        );
    }

    #[tokio::test]
    async fn test_measure_without_connection() {
        let mut source = SerialPressureSource::new(Some("COM4".to_string()), DEFAULT_BAUD_RATE);

        let result = source.measure_once(Channel::Vac1).await;
        assert!(matches!(result, Err(VacuumError::NotConnected)));
    }

    #[tokio::test]
    async fn test_disconnect_when_closed() {
        let mut source = SerialPressureSource::new(None, DEFAULT_BAUD_RATE);
        assert!(source.disconnect().await.is_ok());
        assert!(!source.is_connected());
    }

    #[test]
    fn test_list_ports_doesnt_panic() {
        let _ = SerialPressureSource::list_available_ports();
    }
}
