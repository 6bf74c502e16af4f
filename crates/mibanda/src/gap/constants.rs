// Address types as carried in HCI LE advertising reports
pub const PUBLIC_DEVICE_ADDRESS: u8 = 0x00;
pub const RANDOM_DEVICE_ADDRESS: u8 = 0x01;

// LE Scan parameters
pub const LE_SCAN_ACTIVE: u8 = 0x01;
pub const LE_SCAN_INTERVAL: u16 = 0x0010; // 10 ms
pub const LE_SCAN_WINDOW: u16 = 0x0010; // 10 ms

// Advertising Data Types
pub const ADV_TYPE_FLAGS: u8 = 0x01;
pub const ADV_TYPE_SHORT_LOCAL_NAME: u8 = 0x08;
pub const ADV_TYPE_COMPLETE_LOCAL_NAME: u8 = 0x09;
pub const ADV_TYPE_MANUFACTURER_SPECIFIC: u8 = 0xFF;
