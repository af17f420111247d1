//! The descriptor table: immutable byte layouts served during enumeration.
//!
//! These are the exact blobs host tools key on, in particular the
//! vendor/product IDs and the 8-in/64-out vendor report sizes. Changing
//! any of them breaks host compatibility, so they are plain constants
//! rather than something assembled at run time.

/// Vendor ID (MCS Electronics / openmoko pool).
pub const VID: u16 = 0x16D0;
/// Product ID assigned to the HID bootloader.
pub const PID: u16 = 0x106C;

/// Device descriptor.
pub const DEVICE: [u8; 18] = [
    0x12, // bLength
    0x01, // bDescriptorType (Device)
    0x10, 0x01, // bcdUSB 1.10
    0x00, // bDeviceClass (per-interface)
    0x00, // bDeviceSubClass
    0x00, // bDeviceProtocol
    0x08, // bMaxPacketSize0 8
    0xD0, 0x16, // idVendor 0x16D0
    0x6C, 0x10, // idProduct 0x106C
    0x01, 0x00, // bcdDevice 0.01
    0x01, // iManufacturer
    0x01, // iProduct
    0x02, // iSerialNumber
    0x01, // bNumConfigurations 1
];

/// Configuration descriptor with the HID interface, the HID class
/// descriptor and the single interrupt IN endpoint.
pub const CONFIGURATION: [u8; 34] = [
    0x09, // bLength
    0x02, // bDescriptorType (Configuration)
    0x22, 0x00, // wTotalLength 34
    0x01, // bNumInterfaces 1
    0x01, // bConfigurationValue
    0x00, // iConfiguration
    0xC0, // bmAttributes: self powered
    0x32, // bMaxPower 100 mA
    //
    0x09, // bLength
    0x04, // bDescriptorType (Interface)
    0x00, // bInterfaceNumber 0
    0x00, // bAlternateSetting
    0x01, // bNumEndpoints 1
    0x03, // bInterfaceClass (HID)
    0x00, // bInterfaceSubClass
    0x00, // bInterfaceProtocol
    0x00, // iInterface
    //
    0x09, // bLength
    0x21, // bDescriptorType (HID)
    0x11, 0x01, // bcdHID 1.11
    0x00, // bCountryCode
    0x01, // bNumDescriptors
    0x22, // bDescriptorType[0] (Report)
    0x20, 0x00, // wDescriptorLength[0] 32
    //
    0x07, // bLength
    0x05, // bDescriptorType (Endpoint)
    0x81, // bEndpointAddress EP1 IN
    0x03, // bmAttributes (Interrupt)
    0x08, 0x00, // wMaxPacketSize 8
    0x05, // bInterval 5
];

/// HID report descriptor: an 8-byte vendor input report and a 64-byte
/// vendor output report.
pub const HID_REPORT: [u8; 32] = [
    0x06, 0x00, 0xFF, // Usage Page (Vendor Defined 0xFF00)
    0x09, 0x01, //       Usage (0x01)
    0xA1, 0x01, //       Collection (Application)
    0x09, 0x02, //         Usage (0x02)
    0x15, 0x00, //         Logical Minimum (0)
    0x25, 0xFF, //         Logical Maximum (255)
    0x75, 0x08, //         Report Size (8)
    0x95, 0x08, //         Report Count (8)
    0x81, 0x02, //         Input (Data,Var,Abs)
    0x09, 0x03, //         Usage (0x03)
    0x15, 0x00, //         Logical Minimum (0)
    0x25, 0xFF, //         Logical Maximum (255)
    0x75, 0x08, //         Report Size (8)
    0x95, 0x40, //         Report Count (64)
    0x91, 0x02, //         Output (Data,Var,Abs,Non-volatile)
    0xC0, //             End Collection
];

/// String descriptor 0: LANGID table, US English only.
pub const STRING_LANG_ID: [u8; 4] = [0x04, 0x03, 0x09, 0x04];

/// String descriptor 1: manufacturer and product ("HID Bootloader").
pub const STRING_PRODUCT: [u8; 30] = [
    30, 0x03, // bLength, bDescriptorType (String)
    b'H', 0, b'I', 0, b'D', 0, b' ', 0, //
    b'B', 0, b'o', 0, b'o', 0, b't', 0, b'l', 0, b'o', 0, b'a', 0, b'd', 0,
    b'e', 0, b'r', 0,
];

/// String descriptor 2: serial number.
pub const STRING_SERIAL: [u8; 10] = [
    10, 0x03, // bLength, bDescriptorType (String)
    b'0', 0, b'0', 0, b'0', 0, b'1', 0,
];
